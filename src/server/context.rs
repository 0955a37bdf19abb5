//! Shared, read-only server state handed to every session.

use std::sync::Arc;

use crate::auth::{CredentialStore, StaticCredentials};
use crate::config::ServerConfig;
use crate::storage::{Filesystem, LocalFilesystem};

pub struct ServerContext {
    pub config: ServerConfig,
    pub filesystem: Arc<dyn Filesystem>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        filesystem: Arc<dyn Filesystem>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            config,
            filesystem,
            credentials,
        }
    }

    /// Host file system under `config.home_root` and the configured users.
    pub fn local(config: ServerConfig) -> Self {
        let filesystem = Arc::new(LocalFilesystem::new(config.home_root.clone()));
        let credentials = Arc::new(StaticCredentials::new(config.users.clone()));
        Self::new(config, filesystem, credentials)
    }
}
