//! Connection establishment.
//!
//! Validates credentials, opens and authenticates a transport under a
//! deadline, and maps every failure onto [`SessionError`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::error::{SessionError, classify_connect_error};
use super::transport::{Connector, Transport};
use super::types::Credentials;

/// Opens authenticated transports through a [`Connector`].
pub struct Establisher {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
}

impl Establisher {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
        }
    }

    /// Open and authenticate a transport for `credentials`.
    ///
    /// The connector is only invoked once validation passes. When the deadline
    /// expires the connect future is dropped, which tears down whatever part
    /// of the connection had been set up.
    pub async fn establish(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn Transport>, SessionError> {
        credentials.validate()?;

        let label = credentials.label();
        match tokio::time::timeout(self.connect_timeout, self.connector.connect(credentials)).await
        {
            Ok(Ok(transport)) => {
                info!("Authenticated SSH connection to {}", label);
                Ok(transport)
            }
            Ok(Err(e)) => {
                let error = classify_connect_error(&e);
                warn!("SSH connection to {} failed: {}", label, e);
                Err(error)
            }
            Err(_) => {
                warn!(
                    "SSH connection to {} timed out after {:?}",
                    label, self.connect_timeout
                );
                Err(SessionError::ConnectionTimeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::error::ValidationError;
    use crate::ssh::testing::{ConnectBehavior, MockConnector, credentials};

    fn establisher(connector: MockConnector, timeout: Duration) -> Establisher {
        Establisher::new(Arc::new(connector), timeout)
    }

    mod validation {
        use super::*;

        #[tokio::test]
        async fn test_empty_hostname_never_connects() {
            let connector = MockConnector::new(ConnectBehavior::Succeed);
            let probe = connector.probe.clone();
            let establisher = establisher(connector, Duration::from_secs(1));

            let creds = Credentials {
                hostname: "  ".to_string(),
                ..credentials()
            };
            let result = establisher.establish(&creds).await;

            assert_eq!(
                result.err(),
                Some(SessionError::Validation(ValidationError::EmptyHostname))
            );
            assert_eq!(probe.attempts(), 0);
        }

        #[tokio::test]
        async fn test_missing_credentials_never_connects() {
            let connector = MockConnector::new(ConnectBehavior::Succeed);
            let probe = connector.probe.clone();
            let establisher = establisher(connector, Duration::from_secs(1));

            let creds = Credentials {
                password: None,
                ..credentials()
            };
            let result = establisher.establish(&creds).await;

            assert_eq!(
                result.err(),
                Some(SessionError::Validation(ValidationError::NoCredentials))
            );
            assert_eq!(probe.attempts(), 0);
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn test_auth_rejection_is_classified() {
            let connector = MockConnector::new(ConnectBehavior::Fail(
                "password authentication rejected",
            ));
            let result = establisher(connector, Duration::from_secs(1))
                .establish(&credentials())
                .await;
            assert_eq!(result.err(), Some(SessionError::AuthFailed));
        }

        #[tokio::test]
        async fn test_refused_is_classified() {
            let connector = MockConnector::new(ConnectBehavior::Fail(
                "Failed to connect: Connection refused (os error 111)",
            ));
            let result = establisher(connector, Duration::from_secs(1))
                .establish(&credentials())
                .await;
            assert_eq!(result.err(), Some(SessionError::ConnectionRefused));
        }

        #[tokio::test]
        async fn test_other_errors_are_generic() {
            let connector =
                MockConnector::new(ConnectBehavior::Fail("Failed to connect: No route to host"));
            let result = establisher(connector, Duration::from_secs(1))
                .establish(&credentials())
                .await;
            assert_eq!(result.err(), Some(SessionError::ConnectionFailed));
        }

        #[tokio::test(start_paused = true)]
        async fn test_deadline_drops_the_attempt() {
            let connector = MockConnector::new(ConnectBehavior::Hang);
            let probe = connector.probe.clone();
            let result = establisher(connector, Duration::from_secs(10))
                .establish(&credentials())
                .await;

            assert_eq!(result.err(), Some(SessionError::ConnectionTimeout));
            assert_eq!(probe.attempts(), 1);
            assert_eq!(probe.released(), 1);
        }
    }

    #[tokio::test]
    async fn test_success_returns_transport() {
        let connector = MockConnector::new(ConnectBehavior::Succeed);
        let result = establisher(connector, Duration::from_secs(1))
            .establish(&credentials())
            .await;
        assert!(result.is_ok());
    }
}
