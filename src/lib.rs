//! Shared configuration for the versioned documentation release tooling.
//!
//! The promoter binary and its tests read site layout, the project catalogue
//! and the network policy from here so that every component agrees on where
//! registries and content trees live.

pub mod config;

pub use config::{ConfigError, FetchPolicy, ProjectConfig, ReleaseConfig};
