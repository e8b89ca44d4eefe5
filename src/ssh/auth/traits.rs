//! The seam every login method implements.

use async_trait::async_trait;
use russh::client;

use crate::ssh::session::SshClientHandler;

/// One way of proving identity to the remote host.
///
/// `Ok(false)` means the server refused these credentials and the next
/// method may be tried. `Err` carries the raw cause of a broken exchange; it
/// is logged server-side and classified before anything reaches the browser.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    async fn authenticate(
        &self,
        handle: &mut client::Handle<SshClientHandler>,
        username: &str,
    ) -> Result<bool, String>;

    /// Short name used in debug logs.
    fn name(&self) -> &'static str;
}
