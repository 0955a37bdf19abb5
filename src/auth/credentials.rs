//! Credential storage and validation

use std::collections::HashMap;

/// Account used when no users are configured.
pub const DEFAULT_USER: &str = "cs472";
pub const DEFAULT_PASSWORD: &str = "hw2ftp";

/// Checks a username/password pair.
pub trait CredentialStore: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// In-memory user to password map, loaded from configuration.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new(default_users())
    }
}

impl CredentialStore for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        if !is_valid_input(username) || !is_valid_input(password) {
            return false;
        }
        self.users
            .get(username)
            .is_some_and(|stored| stored == password)
    }
}

pub fn default_users() -> HashMap<String, String> {
    HashMap::from([(DEFAULT_USER.to_string(), DEFAULT_PASSWORD.to_string())])
}

/// Rejects empty input and anything carrying control-line terminators.
fn is_valid_input(input: &str) -> bool {
    !input.trim().is_empty() && !input.contains(['\r', '\n', '\0'])
}
