//! Client session management
//!
//! Per-connection state, the control loop that drives it, and the registry
//! of live sessions.

pub mod handler;
pub mod registry;
pub mod state;

pub use handler::handle_client;
pub use registry::{SessionId, SessionRegistry};
pub use state::{LoginState, Session};
