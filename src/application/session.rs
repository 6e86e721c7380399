//! Per-user upload sessions.
//!
//! The store is the only state shared across request tasks. Every read and
//! write goes through one reader/writer lock over the whole record map;
//! callers receive snapshots, never live references. A background reaper
//! task evicts sessions idle past the configured timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};

use crate::infrastructure::redact;

/// Lifecycle state of a session.
///
/// Sessions move `Empty → Loading → Processing → Complete`; deletion
/// removes the record entirely rather than moving it to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no files queued yet.
    Empty,
    /// At least one file has been queued.
    Loading,
    /// Extraction is in progress.
    Processing,
    /// An export/response cycle finished successfully.
    Complete,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Loading => write!(f, "loading"),
            Self::Processing => write!(f, "processing"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// One user's accumulated upload session.
///
/// Values handed out by the store are defensive copies; mutating them does
/// not affect the stored record.
#[derive(Debug, Clone)]
pub struct Session {
    /// Owning user.
    pub user_id: i64,
    /// Lifecycle state.
    pub state: SessionState,
    /// Opaque file references in upload order.
    pub files: Vec<String>,
    /// When the session was created.
    pub created_at: Instant,
    /// Last interaction; drives idle expiry.
    pub updated_at: Instant,
}

impl Session {
    fn new(user_id: i64) -> Self {
        let now = Instant::now();
        Self {
            user_id,
            state: SessionState::Empty,
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Concurrency-safe in-memory session store.
///
/// Cloning is cheap; clones share the same record map.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<i64, Session>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    /// Creates an empty store with the given idle timeout.
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Returns the existing session, refreshing its last-updated stamp,
    /// or creates and stores a fresh empty one.
    pub async fn get_or_create(&self, user_id: i64) -> Session {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id)
            .or_insert_with(|| Session::new(user_id));
        session.updated_at = Instant::now();
        session.clone()
    }

    /// Returns the session if it exists. Does not create, does not refresh.
    pub async fn get(&self, user_id: i64) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).cloned()
    }

    /// Appends a file reference, creating the session if absent.
    ///
    /// The state transitions to `Loading` unconditionally. Upload limits
    /// are the orchestrator's responsibility, checked before this call.
    pub async fn append_file(&self, user_id: i64, file_ref: impl Into<String>) -> Session {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id)
            .or_insert_with(|| Session::new(user_id));
        session.files.push(file_ref.into());
        session.state = SessionState::Loading;
        session.updated_at = Instant::now();
        session.clone()
    }

    /// Sets the session state, refreshing the last-updated stamp.
    /// No-op when the session does not exist.
    pub async fn set_state(&self, user_id: i64, state: SessionState) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&user_id) {
            session.state = state;
            session.updated_at = Instant::now();
        }
    }

    /// Removes the session entirely. No-op when absent.
    pub async fn clear(&self, user_id: i64) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&user_id);
    }

    /// Number of queued files; 0 when the session does not exist.
    pub async fn file_count(&self, user_id: i64) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).map_or(0, |s| s.files.len())
    }

    /// Snapshot of the queued file references; empty when absent.
    pub async fn files(&self, user_id: i64) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).map_or_else(Vec::new, |s| s.files.clone())
    }

    /// Removes every session idle past the timeout. Returns the eviction
    /// count. Holds the write lock for the full sweep.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|user_id, session| {
            let keep = now.duration_since(session.updated_at) <= self.idle_timeout;
            if !keep {
                tracing::info!(
                    user = %redact(&user_id.to_string()),
                    state = %session.state,
                    "evicting idle session"
                );
            }
            keep
        });
        before - sessions.len()
    }

    /// Spawns the background reaper: a single perpetual task that sweeps
    /// on a fixed interval. The interval is independent of the idle
    /// timeout; a timeout shorter than the interval still expires on the
    /// next tick.
    pub fn spawn_reaper(&self, sweep_interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(sweep_interval);
            loop {
                ticker.tick().await;
                let evicted = store.sweep_expired().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "reaper sweep finished");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_get_or_create_then_get() {
        let store = SessionStore::new(TIMEOUT);

        let created = store.get_or_create(7).await;
        assert_eq!(created.state, SessionState::Empty);
        assert!(created.files.is_empty());

        let fetched = store.get(7).await.unwrap();
        assert_eq!(fetched.user_id, 7);

        assert!(store.get(8).await.is_none());
    }

    #[tokio::test]
    async fn test_append_file_creates_and_transitions() {
        let store = SessionStore::new(TIMEOUT);

        let session = store.append_file(1, "a.json").await;
        assert_eq!(session.state, SessionState::Loading);
        assert_eq!(session.files, vec!["a.json".to_string()]);

        // Appending past Processing still forces Loading.
        store.set_state(1, SessionState::Processing).await;
        let session = store.append_file(1, "b.json").await;
        assert_eq!(session.state, SessionState::Loading);
        assert_eq!(store.file_count(1).await, 2);
    }

    #[tokio::test]
    async fn test_set_state_and_clear_are_noops_when_absent() {
        let store = SessionStore::new(TIMEOUT);

        store.set_state(99, SessionState::Complete).await;
        assert!(store.get(99).await.is_none());

        store.clear(99).await;
        assert_eq!(store.file_count(99).await, 0);
    }

    #[tokio::test]
    async fn test_files_snapshot_is_a_defensive_copy() {
        let store = SessionStore::new(TIMEOUT);
        store.append_file(1, "a.json").await;

        let mut snapshot = store.files(1).await;
        snapshot.push("b.json".into());

        assert_eq!(store.file_count(1).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let store = SessionStore::new(TIMEOUT);
        let n = 32;

        let mut handles = Vec::new();
        for i in 0..n {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append_file(1, format!("file_{i}.json")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let files = store.files(1).await;
        assert_eq!(files.len(), n);
        let unique: std::collections::HashSet<_> = files.iter().collect();
        assert_eq!(unique.len(), n);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_idle_and_keeps_fresh() {
        let store = SessionStore::new(TIMEOUT);
        store.get_or_create(1).await;
        advance(TIMEOUT + Duration::from_secs(1)).await;
        store.get_or_create(2).await;

        let evicted = store.sweep_expired().await;
        assert_eq!(evicted, 1);
        assert!(store.get(1).await.is_none());
        assert!(store.get(2).await.is_some());

        // A fresh session survives any number of sweeps.
        for _ in 0..5 {
            assert_eq!(store.sweep_expired().await, 0);
        }
        assert!(store.get(2).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_create_refreshes_but_get_does_not() {
        let store = SessionStore::new(TIMEOUT);
        store.get_or_create(1).await;
        store.get_or_create(2).await;

        advance(Duration::from_secs(25)).await;
        store.get_or_create(1).await; // refreshed
        store.get(2).await; // read-only, no refresh

        advance(Duration::from_secs(10)).await;
        store.sweep_expired().await;

        assert!(store.get(1).await.is_some());
        assert!(store.get(2).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_with_short_timeout_and_default_style_interval() {
        let store = SessionStore::new(Duration::from_secs(1));
        store.get_or_create(1).await;
        let reaper = store.spawn_reaper(Duration::from_secs(300));

        // Timeout long expired, but the next tick is what evicts.
        advance(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;

        assert!(store.get(1).await.is_none());
        reaper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_with_timeout_shorter_than_interval() {
        let store = SessionStore::new(TIMEOUT);
        store.get_or_create(1).await;
        let reaper = store.spawn_reaper(Duration::from_secs(60));

        // Let the immediate first tick pass; the session is fresh there.
        tokio::task::yield_now().await;
        assert!(store.get(1).await.is_some());

        advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(store.get(1).await.is_none());
        reaper.abort();
    }
}