//! Authentication strategies for SSH connections.
//!
//! Each strategy pairs an applicability predicate (are its credentials
//! configured?) with an attempt against the transport. [`AuthChain`] evaluates
//! an ordered list of strategies in a loop, so the fallback order is data
//! rather than control flow.
//!
//! # Available Strategies
//!
//! - [`NoneAuth`]: `none` method, needs only a username
//! - [`PasswordAuth`]: Password-based authentication
//! - [`KeyAuth`]: Public/private key file authentication
//!
//! # Example
//!
//! ```ignore
//! use ssh_sftp::ssh::auth::{AuthChain, AuthStrategy};
//!
//! let chain = AuthChain::standard(); // none -> password -> key
//! let ok = chain.authenticate(transport, &config).await?;
//! ```

mod chain;
mod key;
mod none;
mod password;
mod traits;

pub use chain::AuthChain;
pub use key::KeyAuth;
pub use none::NoneAuth;
pub use password::PasswordAuth;
pub use traits::AuthStrategy;
