//! Authentication system
//!
//! Verifies USER/PASS pairs against a credential store.

pub mod credentials;

pub use credentials::{CredentialStore, StaticCredentials};
