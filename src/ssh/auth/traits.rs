//! Authentication strategy trait definition.

use async_trait::async_trait;

use crate::ssh::config::ConnectionConfig;
use crate::ssh::transport::Transport;

/// Trait for SSH authentication strategies.
///
/// Implementations must be thread-safe (`Send + Sync`). Credentials are read
/// from the [`ConnectionConfig`] at attempt time, so one strategy value can be
/// reused across sessions.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Whether the credentials this strategy needs are present in `config`.
    ///
    /// Strategies that are not applicable are skipped by the chain and do not
    /// count as failed attempts.
    fn is_applicable(&self, config: &ConnectionConfig) -> bool;

    /// Attempt to authenticate.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Authentication succeeded
    /// * `Ok(false)` - Authentication failed (credentials rejected)
    /// * `Err(message)` - Error during authentication attempt
    async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        config: &ConnectionConfig,
    ) -> Result<bool, String>;

    /// Used for logging and error messages.
    fn name(&self) -> &'static str;
}
