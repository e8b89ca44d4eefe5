//! Entry point for the web layer.
//!
//! [`SessionManager`] owns the registry, the bridge and the reaper task. It is
//! constructed once at startup and shared through an `Arc`.

use std::fmt::Display;
use std::sync::Arc;

use futures::{Sink, Stream};
use tracing::info;

use super::bridge::Bridge;
use super::config::Config;
use super::error::SessionError;
use super::protocol::ClientFrame;
use super::reaper::Reaper;
use super::registry::SessionRegistry;
use super::transport::Connector;
use super::types::{Credentials, SessionId, TerminalSize};

pub struct SessionManager {
    registry: Arc<SessionRegistry>,
    bridge: Bridge,
    reaper: Reaper,
}

impl SessionManager {
    /// Build the registry and start the reaper. Must be called inside a tokio runtime.
    pub fn new(config: &Config, connector: Arc<dyn Connector>) -> Self {
        let registry = Arc::new(SessionRegistry::new(
            connector,
            config.max_connections,
            config.connect_timeout,
        ));
        let bridge = Bridge::new(registry.clone(), config.connect_timeout, config.buffer_size);
        let reaper = Reaper::spawn(
            registry.clone(),
            config.cleanup_interval,
            config.session_timeout,
        );

        Self {
            registry,
            bridge,
            reaper,
        }
    }

    /// Authenticate a new session and return its id.
    pub async fn create_session(&self, credentials: Credentials) -> Result<SessionId, SessionError> {
        self.registry.create(credentials).await
    }

    /// Bridge a terminal client to a session until either side closes.
    pub async fn attach<Tx, Rx, E>(
        &self,
        session_id: &str,
        client_tx: Tx,
        client_rx: Rx,
        initial_size: Option<TerminalSize>,
    ) -> Result<(), SessionError>
    where
        Tx: Sink<ClientFrame> + Send + Unpin + 'static,
        Tx::Error: Display + Send,
        Rx: Stream<Item = Result<ClientFrame, E>> + Send + Unpin,
        E: Display + Send,
    {
        self.bridge
            .attach(session_id, client_tx, client_rx, initial_size)
            .await
    }

    /// Number of sessions currently held.
    pub fn status(&self) -> usize {
        self.registry.count()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Stop the reaper and force-close every session.
    pub async fn shutdown(&self) {
        self.reaper.stop().await;

        let session_ids = self.registry.session_ids();
        let total = session_ids.len();
        for session_id in session_ids {
            self.registry.evict(&session_id).await;
        }
        info!("Session manager shut down, closed {} session(s)", total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::error::ValidationError;
    use crate::ssh::testing::{ConnectBehavior, MockConnector, credentials};

    fn manager(connector: MockConnector) -> SessionManager {
        let config = Config {
            max_connections: 2,
            ..Config::default()
        };
        SessionManager::new(&config, Arc::new(connector))
    }

    #[tokio::test]
    async fn test_status_counts_sessions() {
        let manager = manager(MockConnector::new(ConnectBehavior::Succeed));
        assert_eq!(manager.status(), 0);

        manager.create_session(credentials()).await.unwrap();
        manager.create_session(credentials()).await.unwrap();
        assert_eq!(manager.status(), 2);
        assert_eq!(
            manager.create_session(credentials()).await,
            Err(SessionError::Capacity)
        );

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_validation_error_is_returned() {
        let manager = manager(MockConnector::new(ConnectBehavior::Succeed));
        let creds = Credentials {
            username: " ".to_string(),
            ..credentials()
        };
        assert_eq!(
            manager.create_session(creds).await,
            Err(SessionError::Validation(ValidationError::EmptyUsername))
        );
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let connector = MockConnector::new(ConnectBehavior::Succeed);
        let probe = connector.probe.clone();
        let manager = manager(connector);
        manager.create_session(credentials()).await.unwrap();
        manager.create_session(credentials()).await.unwrap();

        manager.shutdown().await;

        assert_eq!(manager.status(), 0);
        assert_eq!(probe.disconnects(), 2);
    }
}
