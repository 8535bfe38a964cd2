//! Release promotion for the versioned documentation site.
//!
//! This crate turns the `unreleased` content tree of a project into a
//! versioned release. It is used by the `docs-release` binary.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Error types
//! - [`index_patch`] - Latest-version link rewriting in the project index
//! - [`inference`] - Tested Kubernetes version inference from upstream
//! - [`journal`] - Undo journal for partially applied promotions
//! - [`landing`] - Version landing page rendering
//! - [`latest`] - The `latest` command
//! - [`layout`] - Site path resolution
//! - [`logging`] - Subscriber setup for the binary
//! - [`output`] - Output formatting
//! - [`pipeline`] - The promotion state machine
//! - [`registry`] - The per-project version registry

pub mod cli;
pub mod error;
pub mod index_patch;
pub mod inference;
pub mod journal;
pub mod landing;
pub mod latest;
pub mod layout;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod registry;
