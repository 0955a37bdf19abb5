//! Navigate module
//!
//! Working directory commands: CWD, CDUP and PWD.

mod operations;

pub use operations::{handle_cdup, handle_cwd, handle_pwd};
