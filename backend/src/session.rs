use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// SessionToken
///
/// Server-side handle of one login. Carried to the browser inside the signed identity
/// cookie as the `sid` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub Uuid);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session
///
/// What a successful login produces: the server marker and the identity it is bound to.
/// No role is stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
}

/// SessionStore Contract
///
/// Each entry is keyed by its own token and only touched by requests presenting that
/// token, so implementations need no cross-session coordination.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, username: &str) -> SessionToken;
    /// Unknown or already destroyed tokens are ignored.
    async fn destroy(&self, token: SessionToken);
    /// Returns the bound username and refreshes the idle timer, or `None` when the
    /// session does not exist or has been idle past the window.
    async fn identity_of(&self, token: SessionToken) -> Option<String>;
    /// Drops every idle session. Returns how many were removed.
    async fn purge_idle(&self) -> usize;
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

struct SessionEntry {
    username: String,
    last_seen: DateTime<Utc>,
}

/// MemorySessionStore
///
/// In-process session table with a sliding idle window. Sessions do not survive a
/// restart; users simply log in again.
pub struct MemorySessionStore {
    entries: RwLock<HashMap<SessionToken, SessionEntry>>,
    idle_timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Same as `purge_idle`, evaluated at an explicit instant.
    pub async fn purge_idle_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.last_seen <= self.idle_timeout);
        before - entries.len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, username: &str) -> SessionToken {
        let token = SessionToken::generate();
        self.entries.write().await.insert(
            token,
            SessionEntry {
                username: username.to_string(),
                last_seen: Utc::now(),
            },
        );
        token
    }

    async fn destroy(&self, token: SessionToken) {
        self.entries.write().await.remove(&token);
    }

    async fn identity_of(&self, token: SessionToken) -> Option<String> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&token)?;

        if now - entry.last_seen > self.idle_timeout {
            entries.remove(&token);
            return None;
        }

        entry.last_seen = now;
        Some(entry.username.clone())
    }

    async fn purge_idle(&self) -> usize {
        self.purge_idle_at(Utc::now()).await
    }
}

/// Background task that drops idle sessions on a fixed interval.
pub async fn run_purge_loop(sessions: SessionState, interval_secs: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let purged = sessions.purge_idle().await;
        if purged > 0 {
            tracing::info!("Session purge: dropped {} idle sessions", purged);
        }
    }
}
