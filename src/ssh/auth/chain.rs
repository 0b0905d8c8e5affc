//! Authentication chain for trying multiple strategies.

use async_trait::async_trait;

use crate::ssh::config::ConnectionConfig;
use crate::ssh::report;
use crate::ssh::transport::Transport;

use super::traits::AuthStrategy;
use super::{KeyAuth, NoneAuth, PasswordAuth};

/// Authentication chain that tries multiple strategies in order.
///
/// Strategies are tried in the order they were added. Strategies whose
/// credentials are absent are skipped. The first successful authentication
/// stops the chain; each applicable strategy is attempted at most once.
///
/// # Example
///
/// ```ignore
/// let chain = AuthChain::new()
///     .with_none()
///     .with_password()
///     .with_key();
///
/// let ok = chain.authenticate(transport, &config).await?;
/// ```
pub struct AuthChain {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl AuthChain {
    /// Create a new empty authentication chain.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The default order: none, then password, then public key.
    pub fn standard() -> Self {
        Self::new().with_none().with_password().with_key()
    }

    pub fn with_none(self) -> Self {
        self.with_strategy(NoneAuth::new())
    }

    pub fn with_password(self) -> Self {
        self.with_strategy(PasswordAuth::new())
    }

    pub fn with_key(self) -> Self {
        self.with_strategy(KeyAuth::new())
    }

    /// Append any strategy to the end of the chain.
    pub fn with_strategy(mut self, strategy: impl AuthStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Strategy names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for AuthChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthStrategy for AuthChain {
    fn is_applicable(&self, config: &ConnectionConfig) -> bool {
        self.strategies.iter().any(|s| s.is_applicable(config))
    }

    async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        config: &ConnectionConfig,
    ) -> Result<bool, String> {
        let debug = config.debug();
        let mut attempted = 0usize;
        let mut last_error = None;

        for strategy in &self.strategies {
            if !strategy.is_applicable(config) {
                report!(debug, "Skipping {} authentication: not configured", strategy.name());
                continue;
            }

            attempted += 1;
            report!(debug, "Trying authentication strategy: {}", strategy.name());

            match strategy.authenticate(transport, config).await {
                Ok(true) => {
                    report!(
                        debug,
                        "Authentication succeeded with strategy: {}",
                        strategy.name()
                    );
                    return Ok(true);
                }
                Ok(false) => {
                    report!(debug, "Authentication failed with strategy: {}", strategy.name());
                    last_error = Some(format!("{} authentication rejected", strategy.name()));
                }
                Err(e) => {
                    report!(
                        debug,
                        "Authentication error with strategy {}: {}",
                        strategy.name(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        if attempted == 0 {
            return Err("No authentication credentials configured".to_string());
        }

        Err(last_error.unwrap_or_else(|| "All authentication methods failed".to_string()))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}
