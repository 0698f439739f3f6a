//! Target descriptors and resolution.
//!
//! A run starts from a [`TargetDescriptor`]: a single IP address, a CIDR
//! subnet, or a file listing a mix of both. Descriptors are validated at
//! construction; [`TargetResolver`] turns one into the deduplicated list
//! of [`ResolvedTarget`]s the prober consumes.
//!
//! No DNS resolution is performed anywhere: targets are IP literals only.

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target '{0}': not an IP address or CIDR subnet")]
    InvalidTarget(String),

    #[error("path traversal attempt not allowed: '{0}'")]
    PathTraversal(PathBuf),

    #[error("target list file '{0}' does not exist or is not a file")]
    FileNotFound(PathBuf),

    #[error("cannot read target list file '{path}': {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("cannot write canonicalized target list '{path}': {reason}")]
    Unwritable { path: PathBuf, reason: String },
}

/// What the user asked to scan.
///
/// Immutable once constructed; the constructors reject malformed input so
/// an instance is always well-formed.
#[derive(Debug, Clone)]
pub enum TargetDescriptor {
    /// A single IPv4 or IPv6 address literal.
    Single(IpAddr),
    /// A CIDR subnet, normalized to its network address.
    Subnet(IpNetwork),
    /// A validated path to a list file inside the input directory.
    ListFile(PathBuf),
}

impl TargetDescriptor {
    /// Parse a single address literal.
    pub fn address(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        s.parse::<IpAddr>()
            .map(Self::Single)
            .map_err(|_| TargetError::InvalidTarget(s.to_string()))
    }

    /// Parse a CIDR subnet. Host bits are permitted and truncated.
    pub fn subnet(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();
        let network: IpNetwork = s
            .parse()
            .map_err(|_| TargetError::InvalidTarget(s.to_string()))?;
        Ok(Self::Subnet(truncate_host_bits(network)))
    }

    /// Validate a list file path.
    ///
    /// The path (relative paths are taken relative to `input_dir`) must
    /// stay inside `input_dir` after normalizing `.` and `..` components.
    /// Confinement is checked before existence, so a traversal to a file
    /// that does exist still fails with [`TargetError::PathTraversal`].
    pub fn list_file(path: impl AsRef<Path>, input_dir: &Path) -> Result<Self, TargetError> {
        let confined = confine_to(input_dir, path.as_ref())?;
        if !confined.is_file() {
            return Err(TargetError::FileNotFound(confined));
        }
        Ok(Self::ListFile(confined))
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Subnet(net) => write!(f, "{}", net),
            Self::ListFile(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A single probe-ready target: one address or one subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedTarget {
    Address(IpAddr),
    Network(IpNetwork),
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(ip) => write!(f, "{}", ip),
            Self::Network(net) => write!(f, "{}", net),
        }
    }
}

/// Resolves descriptors into probe-ready targets.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    input_dir: PathBuf,
}

impl TargetResolver {
    /// Create a resolver confined to the given input directory.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    /// Resolve a descriptor into an ordered, deduplicated target list.
    ///
    /// For a list file, each non-empty line is trimmed and validated as an
    /// address or subnet; invalid lines are logged and dropped, never
    /// fatal. The surviving entries are written back to the same file
    /// (canonicalization side effect) before being returned.
    pub fn resolve(&self, descriptor: &TargetDescriptor) -> Result<Vec<ResolvedTarget>, TargetError> {
        match descriptor {
            TargetDescriptor::Single(ip) => Ok(vec![ResolvedTarget::Address(*ip)]),
            TargetDescriptor::Subnet(net) => Ok(vec![ResolvedTarget::Network(*net)]),
            TargetDescriptor::ListFile(path) => self.resolve_list_file(path),
        }
    }

    fn resolve_list_file(&self, path: &Path) -> Result<Vec<ResolvedTarget>, TargetError> {
        // Re-check confinement: the descriptor is validated at
        // construction, but resolve() may be handed a descriptor built
        // against a different resolver.
        let path = confine_to(&self.input_dir, path)?;

        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TargetError::FileNotFound(path.clone()),
            _ => TargetError::Unreadable {
                path: path.clone(),
                reason: e.to_string(),
            },
        })?;

        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for line in content.lines() {
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }
            let target = if let Ok(ip) = entry.parse::<IpAddr>() {
                ResolvedTarget::Address(ip)
            } else if let Ok(net) = entry.parse::<IpNetwork>() {
                ResolvedTarget::Network(truncate_host_bits(net))
            } else {
                warn!(entry, file = %path.display(), "invalid target entry ignored");
                continue;
            };
            if seen.insert(target) {
                targets.push(target);
            }
        }

        // Canonicalization side effect: the validated, deduplicated list
        // replaces the original file contents.
        let canonical: String = targets.iter().map(|t| format!("{}\n", t)).collect();
        fs::write(&path, canonical).map_err(|e| TargetError::Unwritable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!(file = %path.display(), count = targets.len(), "target list canonicalized");

        Ok(targets)
    }

    /// The input directory this resolver confines list files to.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }
}

/// Normalize a network to its network address (non-strict CIDR).
fn truncate_host_bits(network: IpNetwork) -> IpNetwork {
    match network {
        IpNetwork::V4(net) => {
            // Prefix came from a parsed network, so reconstruction cannot fail.
            IpNetwork::V4(Ipv4Network::new(net.network(), net.prefix()).unwrap_or(net))
        }
        IpNetwork::V6(net) => {
            IpNetwork::V6(Ipv6Network::new(net.network(), net.prefix()).unwrap_or(net))
        }
    }
}

/// Lexically resolve `requested` against `base` and reject escapes.
fn confine_to(base: &Path, requested: &Path) -> Result<PathBuf, TargetError> {
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        base.join(requested)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(TargetError::PathTraversal(requested.to_path_buf()));
                }
            }
            other => normalized.push(other),
        }
    }

    if normalized.starts_with(base) && normalized != base {
        Ok(normalized)
    } else {
        Err(TargetError::PathTraversal(requested.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_list(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_parse_ipv4_address() {
        let desc = TargetDescriptor::address("10.0.0.5").unwrap();
        assert!(matches!(desc, TargetDescriptor::Single(IpAddr::V4(_))));
    }

    #[test]
    fn test_parse_ipv6_address() {
        let desc = TargetDescriptor::address("::1").unwrap();
        assert!(matches!(desc, TargetDescriptor::Single(IpAddr::V6(_))));
    }

    #[test]
    fn test_malformed_address_rejected() {
        let err = TargetDescriptor::address("not-an-ip").unwrap_err();
        assert!(matches!(err, TargetError::InvalidTarget(_)));
    }

    #[test]
    fn test_subnet_host_bits_truncated() {
        let desc = TargetDescriptor::subnet("10.0.0.5/24").unwrap();
        match desc {
            TargetDescriptor::Subnet(net) => assert_eq!(net.to_string(), "10.0.0.0/24"),
            _ => panic!("expected subnet"),
        }
    }

    #[test]
    fn test_malformed_subnet_rejected() {
        assert!(matches!(
            TargetDescriptor::subnet("10.0.0.0/99").unwrap_err(),
            TargetError::InvalidTarget(_)
        ));
    }

    #[test]
    fn test_resolve_single_address() {
        let resolver = TargetResolver::new("/tmp");
        let desc = TargetDescriptor::address("10.0.0.5").unwrap();
        let targets = resolver.resolve(&desc).unwrap();
        assert_eq!(targets, vec![ResolvedTarget::Address("10.0.0.5".parse().unwrap())]);
    }

    #[test]
    fn test_list_file_mixed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(
            dir.path(),
            "targets.txt",
            &["10.0.0.1", "not-an-ip", "", "  10.0.0.1 ", "192.168.0.0/24"],
        );

        let resolver = TargetResolver::new(dir.path());
        let desc = TargetDescriptor::list_file(&path, dir.path()).unwrap();
        let targets = resolver.resolve(&desc).unwrap();

        assert_eq!(
            targets,
            vec![
                ResolvedTarget::Address("10.0.0.1".parse().unwrap()),
                ResolvedTarget::Network("192.168.0.0/24".parse().unwrap()),
            ]
        );

        // Canonicalization wrote the surviving entries back.
        let rewritten = fs::read_to_string(&path).unwrap();
        assert_eq!(rewritten, "10.0.0.1\n192.168.0.0/24\n");
    }

    #[test]
    fn test_list_file_duplicate_subnet_normalized_before_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_list(dir.path(), "nets.txt", &["10.1.0.0/16", "10.1.2.3/16"]);

        let resolver = TargetResolver::new(dir.path());
        let desc = TargetDescriptor::list_file(&path, dir.path()).unwrap();
        let targets = resolver.resolve(&desc).unwrap();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = TargetDescriptor::list_file("../../etc/passwd", dir.path()).unwrap_err();
        assert!(matches!(err, TargetError::PathTraversal(_)));
    }

    #[test]
    fn test_path_traversal_rejected_even_when_target_exists() {
        // /etc/passwd exists on the test host; confinement must still win.
        let dir = tempfile::tempdir().unwrap();
        let escape = format!("{}/../../../../../../etc/passwd", dir.path().display());
        let err = TargetDescriptor::list_file(&escape, dir.path()).unwrap_err();
        assert!(matches!(err, TargetError::PathTraversal(_)));
    }

    #[test]
    fn test_missing_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TargetDescriptor::list_file("absent.txt", dir.path()).unwrap_err();
        assert!(matches!(err, TargetError::FileNotFound(_)));
    }

    #[test]
    fn test_relative_name_resolves_inside_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_list(dir.path(), "subnets.txt", &["10.0.0.0/30"]);
        let desc = TargetDescriptor::list_file("subnets.txt", dir.path()).unwrap();
        assert!(matches!(desc, TargetDescriptor::ListFile(_)));
    }
}
