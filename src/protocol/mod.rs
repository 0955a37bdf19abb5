//! FTP Protocol implementation
//!
//! Control line parsing, verb dispatch and reply rendering.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Command, Verb};
pub use handlers::{Flow, dispatch};
pub use parser::{ParsedLine, parse};
pub use responses::{Reply, write_reply};
