use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Streaming sessions are keyed per client per conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionKey {
    pub client_key: String,
    pub conversation_id: String,
}

impl SessionKey {
    pub fn new(client_key: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            client_key: client_key.into(),
            conversation_id: conversation_id.into(),
        }
    }
}

/// Lifecycle of a streaming session. Transitions are forward-only:
/// CREATED → STARTED → STREAMING → {COMPLETED, ERRORED} → EVICTED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Started,
    Streaming,
    Completed,
    Errored,
    Evicted,
}

impl SessionState {
    fn rank(self) -> u8 {
        match self {
            SessionState::Created => 0,
            SessionState::Started => 1,
            SessionState::Streaming => 2,
            SessionState::Completed | SessionState::Errored => 3,
            SessionState::Evicted => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() >= 3
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamingSession {
    pub key: SessionKey,
    /// Allocated when the session starts; the client's stable message identity.
    pub message_id: Option<String>,
    pub state: SessionState,
    pub created_at_ms: i64,
    pub last_activity_ms: i64,
}

/// Keyed store of live streaming sessions.
///
/// Injectable rather than process-global so test runs stay isolated. All
/// mutation of a given key happens from the owning connection's task plus
/// the eviction sweep, so the per-key sharding of the map is enough.
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, StreamingSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a session for the key. A still-live session under the same key
    /// is evicted first: at most one active session per key, newest wins.
    pub fn create(&self, key: SessionKey) -> StreamingSession {
        if let Some(state) = self.sessions.get(&key).map(|s| s.state) {
            warn!(
                "Evicting superseded session: client={}, conversation={}, state={:?}",
                key.client_key, key.conversation_id, state
            );
            self.evict(&key);
        }

        let now = chrono::Utc::now().timestamp_millis();
        let session = StreamingSession {
            key: key.clone(),
            message_id: None,
            state: SessionState::Created,
            created_at_ms: now,
            last_activity_ms: now,
        };
        self.sessions.insert(key, session.clone());
        session
    }

    pub fn get(&self, key: &SessionKey) -> Option<StreamingSession> {
        self.sessions.get(key).map(|s| s.clone())
    }

    /// Move the session forward. Backward transitions are logged and ignored,
    /// never applied.
    pub fn transition(&self, key: &SessionKey, state: SessionState) -> bool {
        let Some(mut session) = self.sessions.get_mut(key) else {
            debug!("Transition on unknown session: {:?} -> {:?}", key, state);
            return false;
        };
        if state.rank() <= session.state.rank() && state != session.state {
            warn!(
                "Ignoring backward session transition: {:?} -> {:?} (client={}, conversation={})",
                session.state, state, key.client_key, key.conversation_id
            );
            return false;
        }
        session.state = state;
        session.last_activity_ms = chrono::Utc::now().timestamp_millis();
        true
    }

    pub fn set_message_id(&self, key: &SessionKey, message_id: impl Into<String>) {
        if let Some(mut session) = self.sessions.get_mut(key) {
            session.message_id = Some(message_id.into());
        }
    }

    pub fn touch(&self, key: &SessionKey) {
        if let Some(mut session) = self.sessions.get_mut(key) {
            session.last_activity_ms = chrono::Utc::now().timestamp_millis();
        }
    }

    /// Immediate eviction, used on transport disconnect.
    pub fn evict(&self, key: &SessionKey) {
        if let Some((_, mut session)) = self.sessions.remove(key) {
            session.state = SessionState::Evicted;
            debug!(
                "Session evicted: client={}, conversation={}",
                key.client_key, key.conversation_id
            );
        }
    }

    /// Sweep sessions idle past the window. Wall-clock age comparison, no
    /// timer callbacks: cheap and deterministic for testing.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let cutoff = max_idle.as_millis() as i64;
        let stale: Vec<SessionKey> = self
            .sessions
            .iter()
            .filter(|entry| now - entry.last_activity_ms >= cutoff)
            .map(|entry| entry.key().clone())
            .collect();
        let count = stale.len();
        for key in stale {
            self.evict(&key);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic idle sweep in the background, stopped via the token.
pub fn spawn_idle_sweeper(
    registry: Arc<SessionRegistry>,
    max_idle: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {
                    let evicted = registry.evict_idle(max_idle);
                    if evicted > 0 {
                        debug!("Idle sweep evicted {} session(s)", evicted);
                    }
                }
            }
        }
    })
}
