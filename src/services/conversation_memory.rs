//! Bounded per-thread conversation store.
//!
//! Each thread sits behind its own mutex, held for a whole agent turn so
//! turns on one thread are serialized while other threads proceed. The map
//! evicts the least recently used thread past `max_threads`, purges threads
//! idle longer than the TTL, and each thread keeps at most
//! `max_messages_per_thread` messages. A thread whose handle is checked out
//! is never evicted or purged, so the map may briefly exceed `max_threads`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::models::{ConversationMessage, ConversationThread, MemoryConfig};

/// Retention limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_threads: usize,
    pub max_messages_per_thread: usize,
    pub idle_ttl: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for RetentionPolicy {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_threads: config.max_threads.max(1),
            max_messages_per_thread: config.max_messages_per_thread.max(2),
            idle_ttl: (config.idle_ttl_secs > 0).then(|| Duration::from_secs(config.idle_ttl_secs)),
        }
    }
}

struct ThreadSlot {
    thread: Arc<Mutex<ConversationThread>>,
    last_access: Instant,
}

impl ThreadSlot {
    /// Some caller still holds the handle or its lock.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.thread) > 1 || self.thread.try_lock().is_err()
    }
}

/// Thread-keyed conversation memory of one agent.
pub struct ConversationMemory {
    policy: RetentionPolicy,
    threads: Mutex<HashMap<String, ThreadSlot>>,
}

impl ConversationMemory {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            threads: Mutex::new(HashMap::new()),
        }
    }

    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// The thread's handle, creating the thread on first use.
    pub async fn checkout(&self, thread_id: &str) -> Arc<Mutex<ConversationThread>> {
        let now = Instant::now();
        let mut threads = self.threads.lock().await;

        if let Some(ttl) = self.policy.idle_ttl {
            let before = threads.len();
            threads.retain(|_, slot| slot.in_use() || now.duration_since(slot.last_access) <= ttl);
            let purged = before - threads.len();
            if purged > 0 {
                debug!(purged, "Purged idle conversation threads");
            }
        }

        let slot = threads.entry(thread_id.to_string()).or_insert_with(|| ThreadSlot {
            thread: Arc::new(Mutex::new(ConversationThread::new(thread_id))),
            last_access: now,
        });
        slot.last_access = now;
        let handle = Arc::clone(&slot.thread);

        while threads.len() > self.policy.max_threads {
            let oldest = threads
                .iter()
                .filter(|(id, slot)| id.as_str() != thread_id && !slot.in_use())
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    threads.remove(&id);
                    debug!(thread_id = %id, "Evicted least recently used thread");
                }
                None => break,
            }
        }

        handle
    }

    /// Mark a thread as used now, typically when a turn on it ends.
    pub async fn touch(&self, thread_id: &str) {
        if let Some(slot) = self.threads.lock().await.get_mut(thread_id) {
            slot.last_access = Instant::now();
        }
    }

    /// Copy of a thread's messages; empty for unknown threads.
    pub async fn history(&self, thread_id: &str) -> Vec<ConversationMessage> {
        let handle = {
            let threads = self.threads.lock().await;
            threads.get(thread_id).map(|slot| Arc::clone(&slot.thread))
        };
        match handle {
            Some(thread) => thread.lock().await.messages.clone(),
            None => Vec::new(),
        }
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.lock().await.len()
    }

    pub async fn remove(&self, thread_id: &str) -> bool {
        self.threads.lock().await.remove(thread_id).is_some()
    }

    pub async fn clear(&self) {
        self.threads.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(max_threads: usize, max_messages: usize, ttl_secs: u64) -> ConversationMemory {
        ConversationMemory::new(RetentionPolicy::from(&MemoryConfig {
            max_threads,
            max_messages_per_thread: max_messages,
            idle_ttl_secs: ttl_secs,
        }))
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let memory = memory(10, 10, 0);
        let a = memory.checkout("a").await;
        a.lock().await.push(ConversationMessage::user("for a"), 10);

        assert_eq!(memory.history("a").await.len(), 1);
        assert!(memory.history("b").await.is_empty());
        assert_eq!(memory.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let memory = memory(2, 10, 0);
        memory.checkout("one").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        memory.checkout("two").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        memory.checkout("one").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        memory.checkout("three").await;

        assert_eq!(memory.thread_count().await, 2);
        let threads = memory.threads.lock().await;
        assert!(threads.contains_key("one"));
        assert!(threads.contains_key("three"));
        assert!(!threads.contains_key("two"));
    }

    #[tokio::test]
    async fn test_same_handle_for_same_thread() {
        let memory = memory(10, 10, 0);
        let first = memory.checkout("t").await;
        let second = memory.checkout("t").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(memory.remove("t").await);
        assert!(!memory.remove("t").await);
    }

    #[tokio::test]
    async fn test_busy_thread_is_not_evicted() {
        let memory = memory(1, 10, 0);
        let busy = memory.checkout("a").await;
        let _turn = busy.lock().await;

        memory.checkout("b").await;
        assert_eq!(memory.thread_count().await, 2);

        let again = memory.checkout("a").await;
        assert!(Arc::ptr_eq(&busy, &again));
    }

    #[tokio::test]
    async fn test_idle_thread_evicted_once_released() {
        let memory = memory(1, 10, 0);
        let held = memory.checkout("a").await;
        memory.checkout("b").await;
        drop(held);

        memory.checkout("c").await;
        let threads = memory.threads.lock().await;
        assert_eq!(threads.len(), 1);
        assert!(threads.contains_key("c"));
    }

    #[tokio::test]
    async fn test_busy_thread_survives_ttl_purge() {
        let memory = memory(10, 10, 1);
        let busy = memory.checkout("a").await;
        memory.threads.lock().await.get_mut("a").unwrap().last_access =
            Instant::now() - Duration::from_secs(5);

        memory.checkout("b").await;
        assert_eq!(memory.thread_count().await, 2);
        drop(busy);

        memory.threads.lock().await.get_mut("a").unwrap().last_access =
            Instant::now() - Duration::from_secs(5);
        memory.checkout("b").await;
        assert_eq!(memory.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_touch_refreshes_last_access() {
        let memory = memory(10, 10, 0);
        memory.checkout("a").await;
        let stale = Instant::now() - Duration::from_secs(60);
        memory.threads.lock().await.get_mut("a").unwrap().last_access = stale;

        memory.touch("a").await;
        memory.touch("missing").await;
        assert!(memory.threads.lock().await["a"].last_access > stale);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.max_threads, 1000);
        assert_eq!(policy.max_messages_per_thread, 200);
        assert!(policy.idle_ttl.is_none());

        let policy = RetentionPolicy::from(&MemoryConfig {
            max_threads: 0,
            max_messages_per_thread: 0,
            idle_ttl_secs: 30,
        });
        assert_eq!(policy.max_threads, 1);
        assert_eq!(policy.idle_ttl, Some(Duration::from_secs(30)));
    }
}
