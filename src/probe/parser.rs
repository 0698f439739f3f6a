//! Parser for the discovery tool's textual report.
//!
//! nmap's `-sn` output is a human-readable report; this module is the one
//! place that knows its shape, so the tool can be swapped or mocked
//! without touching the rest of the prober.
//!
//! An address is announced by a line containing [`SCAN_REPORT_MARKER`].
//! The canonical address is the line's last token, unless the token is a
//! parenthesized or bracketed literal (nmap appends `(addr)` when it
//! resolved a name), in which case the enclosed content wins.
//!
//! Two parsing rules exist, and the asymmetry is deliberate:
//! - [`ParseMode::Single`]: a one-target sweep only reports hosts worth
//!   reporting, so an announcement alone marks the host live.
//! - [`ParseMode::Batch`]: a multi-target (`-iL`) sweep announces every
//!   input, so a host is live only if a `Host is up` line follows its
//!   announcement within the same record. The pending candidate is
//!   dropped when the next announcement begins.

use std::collections::HashSet;
use std::net::IpAddr;

/// Line marker announcing a scanned address.
pub const SCAN_REPORT_MARKER: &str = "Nmap scan report for";

/// Line marker confirming liveness in batch reports.
pub const HOST_UP_MARKER: &str = "Host is up";

/// How report lines translate into live hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// One address or subnet per invocation; announcements suffice.
    Single,
    /// Many targets fed at once; announcements need confirmation.
    Batch,
}

/// Extract the set of live hosts from a discovery report.
pub fn parse_report(output: &str, mode: ParseMode) -> HashSet<IpAddr> {
    let mut hosts = HashSet::new();
    let mut candidate: Option<IpAddr> = None;

    for line in output.lines() {
        if line.contains(SCAN_REPORT_MARKER) {
            let announced = announced_address(line);
            match mode {
                ParseMode::Single => {
                    if let Some(ip) = announced {
                        hosts.insert(ip);
                    }
                }
                // A new announcement discards any unconfirmed candidate.
                ParseMode::Batch => candidate = announced,
            }
        } else if mode == ParseMode::Batch && line.contains(HOST_UP_MARKER) {
            if let Some(ip) = candidate.take() {
                hosts.insert(ip);
            }
        }
    }

    hosts
}

/// Pull the canonical address out of an announcement line.
fn announced_address(line: &str) -> Option<IpAddr> {
    let token = line.split_whitespace().last()?;
    let literal = token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .or_else(|| token.strip_prefix('[').and_then(|t| t.strip_suffix(']')))
        .unwrap_or(token);
    literal.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    // Captured from `nmap -sn 10.0.0.5`.
    const SINGLE_REPORT: &str = "\
Starting Nmap 7.94 ( https://nmap.org ) at 2024-11-02 14:21 CET
Nmap scan report for 10.0.0.5
Host is up (0.0010s latency).
Nmap done: 1 IP address (1 host up) scanned in 0.05 seconds
";

    // Captured from `nmap -sn 192.168.1.0/29` on a network with local DNS.
    const SUBNET_REPORT: &str = "\
Starting Nmap 7.94 ( https://nmap.org ) at 2024-11-02 14:25 CET
Nmap scan report for router.lan (192.168.1.1)
Host is up (0.0021s latency).
Nmap scan report for 192.168.1.4
Host is up (0.013s latency).
Nmap done: 8 IP addresses (2 hosts up) scanned in 2.31 seconds
";

    // Captured from `nmap -sn -iL targets.txt`; 10.0.0.9 was announced
    // but never confirmed up.
    const BATCH_REPORT: &str = "\
Starting Nmap 7.94 ( https://nmap.org ) at 2024-11-02 14:30 CET
Nmap scan report for 10.0.0.1
Host is up (0.0008s latency).
Nmap scan report for 10.0.0.9
Nmap scan report for printer.lan (10.0.0.23)
Host is up (0.044s latency).
Nmap done: 3 IP addresses (2 hosts up) scanned in 4.10 seconds
";

    #[test]
    fn test_single_report_announcement_suffices() {
        let hosts = parse_report(SINGLE_REPORT, ParseMode::Single);
        assert_eq!(hosts, HashSet::from([ip("10.0.0.5")]));
    }

    #[test]
    fn test_subnet_report_strips_resolved_names() {
        let hosts = parse_report(SUBNET_REPORT, ParseMode::Single);
        assert_eq!(hosts, HashSet::from([ip("192.168.1.1"), ip("192.168.1.4")]));
    }

    #[test]
    fn test_batch_requires_confirmation() {
        let hosts = parse_report(BATCH_REPORT, ParseMode::Batch);
        assert!(hosts.contains(&ip("10.0.0.1")));
        assert!(hosts.contains(&ip("10.0.0.23")));
        // Announced but never confirmed.
        assert!(!hosts.contains(&ip("10.0.0.9")));
    }

    #[test]
    fn test_batch_candidate_reset_after_confirmation() {
        // A stray confirmation line must not re-add the previous host.
        let report = "\
Nmap scan report for 10.0.0.1
Host is up (0.001s latency).
Host is up (0.001s latency).
";
        let hosts = parse_report(report, ParseMode::Batch);
        assert_eq!(hosts.len(), 1);
    }

    #[test]
    fn test_single_mode_ignores_unconfirmed_rule() {
        // In single mode an announcement without a Host is up line still counts.
        let report = "Nmap scan report for 10.0.0.7\n";
        let hosts = parse_report(report, ParseMode::Single);
        assert_eq!(hosts, HashSet::from([ip("10.0.0.7")]));
    }

    #[test]
    fn test_bracketed_ipv6_literal() {
        let report = "Nmap scan report for gateway [fe80::1]\nHost is up.\n";
        let hosts = parse_report(report, ParseMode::Single);
        assert_eq!(hosts, HashSet::from([ip("fe80::1")]));
    }

    #[test]
    fn test_unparseable_announcement_is_skipped() {
        let report = "Nmap scan report for total-garbage\n";
        assert!(parse_report(report, ParseMode::Single).is_empty());
    }

    #[test]
    fn test_empty_report() {
        assert!(parse_report("", ParseMode::Batch).is_empty());
    }
}
