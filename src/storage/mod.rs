//! File system storage
//!
//! Path resolution, permission checks, listings and whole-file I/O behind
//! the `Filesystem` trait.

pub mod filesystem;
pub mod listing;

pub use filesystem::{Filesystem, LocalFilesystem, lexical_parent};
