//! Password-based SSH authentication.

use async_trait::async_trait;

use crate::ssh::config::ConnectionConfig;
use crate::ssh::transport::Transport;

use super::traits::AuthStrategy;

/// Password authentication strategy.
///
/// Uses the configured username and password. A missing username is sent as
/// an empty string and left for the server to reject.
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordAuth;

impl PasswordAuth {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthStrategy for PasswordAuth {
    fn is_applicable(&self, config: &ConnectionConfig) -> bool {
        config.password().is_some()
    }

    async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        config: &ConnectionConfig,
    ) -> Result<bool, String> {
        let Some(password) = config.password() else {
            return Err("Password authentication requires a password".to_string());
        };

        transport
            .authenticate_password(config.username().unwrap_or_default(), password)
            .await
    }

    fn name(&self) -> &'static str {
        "password"
    }
}
