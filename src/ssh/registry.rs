//! DashMap-based session registry.
//!
//! Owns every live session: its transport, its shell channel input (once a
//! bridge has attached) and the lifecycle flags the bridge and reaper act on.
//!
//! # Capacity
//!
//! Capacity is counted in reserved slots rather than map entries. A slot is
//! taken before the network attempt starts and given back when the attempt
//! fails, when the attempt is dropped mid-flight, or when the entry leaves the
//! map. Concurrent creates can never overshoot `max_sessions`.
//!
//! No `DashMap` guard is ever held across an `.await`; handles are cloned or
//! taken out of the entry first.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::SessionError;
use super::establish::Establisher;
use super::transport::{ChannelInput, Connector, Transport};
use super::types::{Credentials, SessionId, SessionSnapshot};

/// Stored session data.
struct Session {
    label: String,
    transport: Arc<dyn Transport>,
    channel: Option<Arc<dyn ChannelInput>>,
    created_at: Instant,
    connected: bool,
    attached: bool,
}

impl Session {
    fn snapshot(&self, id: &str) -> SessionSnapshot {
        SessionSnapshot {
            id: id.to_string(),
            label: self.label.clone(),
            created_at: self.created_at,
            connected: self.connected,
            attached: self.attached,
            has_channel: self.channel.is_some(),
        }
    }
}

/// Concurrent map of live sessions with capacity accounting.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Session>,
    reserved: AtomicUsize,
    max_sessions: usize,
    establisher: Establisher,
}

impl SessionRegistry {
    pub fn new(
        connector: Arc<dyn Connector>,
        max_sessions: usize,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            reserved: AtomicUsize::new(0),
            max_sessions,
            establisher: Establisher::new(connector, connect_timeout),
        }
    }

    /// Validate, connect and register a new session.
    ///
    /// Validation errors are reported before capacity is considered, and
    /// capacity is checked before any network attempt.
    pub async fn create(&self, credentials: Credentials) -> Result<SessionId, SessionError> {
        credentials.validate()?;
        let slot = self.reserve_slot()?;

        let transport = self.establisher.establish(&credentials).await?;

        let id = Uuid::new_v4().to_string();
        let label = credentials.label();
        drop(credentials);

        self.sessions.insert(
            id.clone(),
            Session {
                label: label.clone(),
                transport,
                channel: None,
                created_at: Instant::now(),
                connected: true,
                attached: false,
            },
        );
        slot.commit();

        info!("Session {} created for {}", id, label);
        Ok(id)
    }

    /// Snapshot of a session, if it exists.
    pub fn get(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.snapshot(session_id))
    }

    /// Remove a session from the map without touching its handles.
    ///
    /// Returns `true` if the session existed. Handles are dropped with the entry.
    pub fn remove(&self, session_id: &str) -> bool {
        self.take(session_id).is_some()
    }

    /// Remove a session and release its channel and transport.
    ///
    /// Both handles are closed even if the session was already torn down;
    /// their close operations tolerate repeated calls.
    pub async fn evict(&self, session_id: &str) -> bool {
        let Some(session) = self.take(session_id) else {
            return false;
        };

        if let Some(channel) = session.channel {
            channel.close().await;
        }
        session.transport.disconnect().await;

        info!("Session {} ({}) evicted", session_id, session.label);
        true
    }

    /// Number of sessions currently in the map, including tombstones.
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// All session ids currently in the map.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Transport of a session, for opening its shell channel.
    pub fn transport(&self, session_id: &str) -> Option<Arc<dyn Transport>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.transport.clone())
    }

    /// Claim a session for a single bridge.
    ///
    /// Fails with `SessionNotFound` for an unknown id, `SessionExpired` for a
    /// tombstone and `SessionInUse` if another bridge already holds it. The
    /// existing holder is never disturbed.
    pub fn claim(&self, session_id: &str) -> Result<(), SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(SessionError::SessionNotFound)?;

        if !entry.connected {
            return Err(SessionError::SessionExpired);
        }
        if entry.attached || entry.channel.is_some() {
            return Err(SessionError::SessionInUse);
        }

        entry.attached = true;
        Ok(())
    }

    /// Store the input half of a freshly opened shell channel.
    ///
    /// A session holds at most one channel; a second attach fails and the
    /// first channel stays in place.
    pub fn attach_channel(
        &self,
        session_id: &str,
        channel: Arc<dyn ChannelInput>,
    ) -> Result<(), SessionError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(SessionError::SessionNotFound)?;

        if entry.channel.is_some() {
            return Err(SessionError::SessionInUse);
        }
        if !entry.connected {
            return Err(SessionError::SessionExpired);
        }

        entry.channel = Some(channel);
        Ok(())
    }

    /// Tear a session down but leave its entry for the reaper.
    ///
    /// Clears `connected`, closes the channel and disconnects the transport.
    /// Only the first call does any work; later or concurrent calls return
    /// `false`.
    pub async fn disconnect(&self, session_id: &str) -> bool {
        let Some((channel, transport)) = self.mark_disconnected(session_id) else {
            return false;
        };

        if let Some(channel) = channel {
            channel.close().await;
        }
        transport.disconnect().await;

        debug!("Session {} disconnected, awaiting cleanup", session_id);
        true
    }

    /// Ids of sessions the reaper should evict.
    ///
    /// A session is expired when it was never attached and is older than
    /// `idle_timeout`, or when it has been torn down.
    pub fn expired(&self, idle_timeout: Duration) -> Vec<SessionId> {
        let now = Instant::now();
        self.sessions
            .iter()
            .filter(|entry| {
                !entry.connected
                    || (!entry.attached && now.duration_since(entry.created_at) > idle_timeout)
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn mark_disconnected(
        &self,
        session_id: &str,
    ) -> Option<(Option<Arc<dyn ChannelInput>>, Arc<dyn Transport>)> {
        let mut entry = self.sessions.get_mut(session_id)?;
        if !entry.connected {
            return None;
        }
        entry.connected = false;
        Some((entry.channel.take(), entry.transport.clone()))
    }

    fn take(&self, session_id: &str) -> Option<Session> {
        let (_, session) = self.sessions.remove(session_id)?;
        self.release_slot();
        Some(session)
    }

    fn reserve_slot(&self) -> Result<SlotReservation<'_>, SessionError> {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_sessions).then_some(n + 1)
            })
            .map(|_| SlotReservation {
                reserved: &self.reserved,
                committed: false,
            })
            .map_err(|_| SessionError::Capacity)
    }

    fn release_slot(&self) {
        self.reserved.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A capacity slot held by an in-progress create.
///
/// Returned to the pool on drop unless the session made it into the map.
struct SlotReservation<'a> {
    reserved: &'a AtomicUsize,
    committed: bool,
}

impl SlotReservation<'_> {
    /// The slot now belongs to a map entry and is released when the entry leaves the map.
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.reserved.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
