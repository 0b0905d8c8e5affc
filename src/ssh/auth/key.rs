//! Key file SSH authentication.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::ssh::config::ConnectionConfig;
use crate::ssh::transport::Transport;

use super::traits::AuthStrategy;

/// Public key authentication strategy.
///
/// Uses the configured public key, private key and optional passphrase.
/// When no private key is configured it is looked up next to the public key
/// with the `.pub` extension removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyAuth;

impl KeyAuth {
    pub fn new() -> Self {
        Self
    }
}

/// Private key path for `public_key`, unless one is given explicitly.
pub(crate) fn resolve_private_key_path(public_key: &Path, private_key: Option<&Path>) -> PathBuf {
    match private_key {
        Some(path) => path.to_path_buf(),
        None if public_key.extension().is_some_and(|ext| ext == "pub") => {
            public_key.with_extension("")
        }
        None => public_key.to_path_buf(),
    }
}

#[async_trait]
impl AuthStrategy for KeyAuth {
    fn is_applicable(&self, config: &ConnectionConfig) -> bool {
        config.public_key_path().is_some()
    }

    async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        config: &ConnectionConfig,
    ) -> Result<bool, String> {
        let Some(public_key) = config.public_key_path() else {
            return Err("Key authentication requires a public key".to_string());
        };
        let private_key = resolve_private_key_path(public_key, config.private_key_path());

        transport
            .authenticate_publickey(
                config.username().unwrap_or_default(),
                public_key,
                &private_key,
                config.passphrase(),
            )
            .await
    }

    fn name(&self) -> &'static str {
        "key"
    }
}
