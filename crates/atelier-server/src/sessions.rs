//! Session store: maps session IDs to ongoing conversations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use atelier_ai::{Conversation, GenerationConfig};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// One tracked conversation. The handle is exclusively owned by its
/// session; the mutex serializes exchanges on the same session while
/// leaving cross-session calls concurrent.
struct SessionEntry {
    conversation: Arc<Mutex<Conversation>>,
    last_access: Instant,
    turns: u64,
}

/// Summary row for the introspection endpoint.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Truncated id; full ids are handed only to the session's owner.
    pub id: String,
    pub turns: u64,
    pub idle_secs: u64,
}

/// Thread-safe session store.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a new conversation and insert it under a fresh id. The entry is
    /// fully constructed before it becomes visible to lookup.
    pub async fn create(&self, config: GenerationConfig) -> (String, Arc<Mutex<Conversation>>) {
        let id = uuid::Uuid::new_v4().to_string();
        let conversation = Arc::new(Mutex::new(Conversation::new(config)));
        let mut map = self.sessions.write().await;
        map.insert(
            id.clone(),
            SessionEntry {
                conversation: conversation.clone(),
                last_access: Instant::now(),
                turns: 0,
            },
        );
        tracing::info!(session_id = %id, "Session created");
        (id, conversation)
    }

    /// Fetch a session's conversation, stamping `last_access` on hit. A
    /// miss is a normal outcome, not an error.
    pub async fn lookup(&self, id: &str) -> Option<Arc<Mutex<Conversation>>> {
        let mut map = self.sessions.write().await;
        let entry = map.get_mut(id)?;
        entry.last_access = Instant::now();
        Some(entry.conversation.clone())
    }

    /// Attribute one exchange attempt to the session and return the new
    /// turn number. The counter only increases; failed exchanges keep
    /// their turn.
    pub async fn begin_turn(&self, id: &str) -> Option<u64> {
        let mut map = self.sessions.write().await;
        let entry = map.get_mut(id)?;
        entry.turns += 1;
        Some(entry.turns)
    }

    /// Remove every session idle longer than `ttl`. Returns how many were
    /// evicted.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        let mut map = self.sessions.write().await;
        let now = Instant::now();
        let before = map.len();
        map.retain(|id, entry| {
            let stale = now.duration_since(entry.last_access) > ttl;
            if stale {
                tracing::info!(session_id = %id, turns = entry.turns, "Evicting idle session");
            }
            !stale
        });
        before - map.len()
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        let map = self.sessions.read().await;
        let now = Instant::now();
        map.iter()
            .map(|(id, entry)| SessionSummary {
                id: id.chars().take(8).collect(),
                turns: entry.turns,
                idle_secs: now.duration_since(entry.last_access).as_secs(),
            })
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop all sessions. Used during orderly shutdown.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    /// Spawn the periodic eviction task. The caller owns the handle and
    /// aborts it on shutdown.
    pub fn spawn_sweeper(&self, ttl: Duration, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let evicted = store.sweep(ttl).await;
                let remaining = store.count().await;
                tracing::debug!(evicted, sessions = remaining, "Sweeper tick");
            }
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerationConfig {
        GenerationConfig::image(1.0)
    }

    #[tokio::test]
    async fn lookup_after_create_sees_fresh_session() {
        let store = SessionStore::new();
        let (id, _) = store.create(config()).await;

        assert!(store.lookup(&id).await.is_some());
        let summary = &store.list().await[0];
        assert_eq!(summary.turns, 0);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn lookup_of_unknown_id_misses() {
        let store = SessionStore::new();
        let unknown = uuid::Uuid::new_v4().to_string();
        assert!(store.lookup(&unknown).await.is_none());
        assert!(store.begin_turn(&unknown).await.is_none());
    }

    #[tokio::test]
    async fn turns_only_increase() {
        let store = SessionStore::new();
        let (id, _) = store.create(config()).await;

        assert_eq!(store.begin_turn(&id).await, Some(1));
        assert_eq!(store.begin_turn(&id).await, Some(2));
        assert_eq!(store.begin_turn(&id).await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_only_past_the_ttl_boundary() {
        let store = SessionStore::new();
        let ttl = Duration::from_secs(600);

        let (old_id, _) = store.create(config()).await;
        tokio::time::advance(Duration::from_secs(500)).await;
        let (fresh_id, _) = store.create(config()).await;

        // old: 500s idle, fresh: 0s idle.
        assert_eq!(store.sweep(ttl).await, 0);

        tokio::time::advance(Duration::from_secs(200)).await;
        // old: 700s idle, fresh: 200s idle.
        assert_eq!(store.sweep(ttl).await, 1);
        assert!(store.lookup(&old_id).await.is_none());
        assert!(store.lookup(&fresh_id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn touched_sessions_survive_the_sweep() {
        let store = SessionStore::new();
        let ttl = Duration::from_secs(600);
        let (id, _) = store.create(config()).await;

        tokio::time::advance(Duration::from_secs(550)).await;
        store.lookup(&id).await.unwrap();
        tokio::time::advance(Duration::from_secs(550)).await;

        assert_eq!(store.sweep(ttl).await, 0);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_evicts_on_its_period() {
        let store = SessionStore::new();
        let (_id, _) = store.create(config()).await;

        let handle = store.spawn_sweeper(Duration::from_secs(60), Duration::from_secs(30));
        tokio::task::yield_now().await;
        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(30)).await;
            tokio::task::yield_now().await;
        }

        assert_eq!(store.count().await, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = SessionStore::new();
        store.create(config()).await;
        store.create(config()).await;

        store.clear().await;
        assert_eq!(store.count().await, 0);
    }
}
