//! Server core functionality
//!
//! The control-connection listener and the shared context its sessions use.

pub mod context;
pub mod core;

pub use context::ServerContext;
pub use core::Listener;
