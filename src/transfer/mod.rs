//! Transfer module
//!
//! Data channel negotiation, the channel lifecycle itself, and the
//! LIST/RETR/STOR operations that consume a channel.

pub mod data_channel;
pub mod modes;
pub mod negotiation;
pub mod operations;

pub use data_channel::DataChannel;
pub use modes::{AddressFamily, TransferMode};
pub use negotiation::{handle_eprt, handle_epsv, handle_pasv, handle_port};
pub use operations::{handle_list, handle_retr, handle_stor};
