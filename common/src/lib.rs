//! Filesystem primitives shared by the documentation release tooling: an
//! attribute-preserving tree copy and whole-file atomic replacement.

pub mod atomic;
pub mod tree;

pub use atomic::{AtomicWriteError, replace_file};
pub use tree::{CopySummary, TreeCopyError, TreeOperation, copy_tree};
