//! Login methods tried against the remote host.
//!
//! A connect request may carry a private key, a password, or both. The
//! connector turns them into an [`AuthChain`] tried in this order:
//!
//! 1. [`KeyAuth`]: the key text is decoded in memory, never written to disk
//! 2. [`PasswordAuth`]
//! 3. [`KeyboardInteractiveAuth`]: answers every prompt with the same
//!    password, for servers that only offer keyboard-interactive
//!
//! The first method the server accepts ends the chain.

mod chain;
mod key;
mod keyboard;
mod password;
mod traits;

pub use chain::AuthChain;
pub use key::KeyAuth;
pub use keyboard::KeyboardInteractiveAuth;
pub use password::PasswordAuth;
pub use traits::AuthStrategy;
