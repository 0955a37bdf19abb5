//! Error handling
//!
//! Defines error types for the FTP server and the replies they map onto.

pub mod types;

pub use types::*;
