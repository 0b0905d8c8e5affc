//! `none` SSH authentication.

use async_trait::async_trait;

use crate::ssh::config::ConnectionConfig;
use crate::ssh::transport::Transport;

use super::traits::AuthStrategy;

/// Authenticates with the username alone.
///
/// Succeeds only when the server explicitly permits unauthenticated access
/// for that user.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneAuth;

impl NoneAuth {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthStrategy for NoneAuth {
    fn is_applicable(&self, config: &ConnectionConfig) -> bool {
        config.username().is_some()
    }

    async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        config: &ConnectionConfig,
    ) -> Result<bool, String> {
        let Some(username) = config.username() else {
            return Err("None authentication requires a username".to_string());
        };

        transport.authenticate_none(username).await
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
