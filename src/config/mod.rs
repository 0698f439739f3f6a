//! Configuration management for Riptide.
//!
//! Provides XDG-compliant configuration storage: application settings
//! and the default workspace directory layout.

mod settings;

pub use settings::{AppSettings, Paths};
