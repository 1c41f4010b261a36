//! Per-user conversation memory
//!
//! Bounded, time-expiring message history. Every append runs an eviction
//! sweep over all users first; the sweep is O(active users), which is fine
//! at bot scale but worth revisiting if this ever serves a large fleet.
//! Nothing is persisted: a process restart forgets everything.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Stable per-user identifier handed in by the transport layer.
pub type UserId = i64;

/// Who authored a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single conversation entry. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Clock seam so tests can drive eviction without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Store-level counters for the `/stats` command
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub active_users: usize,
    pub total_messages: usize,
}

#[derive(Default)]
struct Inner {
    conversations: HashMap<UserId, Vec<Entry>>,
    last_activity: HashMap<UserId, DateTime<Utc>>,
}

/// Keyed, time-bounded message history per user
pub struct ConversationStore {
    inner: Mutex<Inner>,
    max_history: usize,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl ConversationStore {
    /// Create a store keeping at most `max_history` exchanges per user and
    /// forgetting users idle longer than `timeout_minutes`.
    pub fn new(max_history: usize, timeout_minutes: i64) -> Self {
        Self::with_clock(max_history, timeout_minutes, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock (for tests)
    pub fn with_clock(max_history: usize, timeout_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_history,
            timeout: Duration::minutes(timeout_minutes),
            clock,
        }
    }

    /// Append an entry to a user's history. Always succeeds.
    ///
    /// Runs the eviction sweep first, then trims the history to the most
    /// recent `2 * max_history` entries (user + assistant pairs).
    pub fn append(&self, user_id: UserId, role: Role, content: impl Into<String>) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        Self::sweep(&mut inner, now, self.timeout);

        let history = inner.conversations.entry(user_id).or_default();
        history.push(Entry {
            role,
            content: content.into(),
            timestamp: now,
        });

        let cap = self.max_history * 2;
        if history.len() > cap {
            let excess = history.len() - cap;
            history.drain(..excess);
        }

        inner.last_activity.insert(user_id, now);
        tracing::debug!(user_id, total = inner.conversations[&user_id].len(), "message appended");
    }

    /// Get a user's history in insertion order, optionally tail-limited.
    /// Unknown users get an empty vec.
    pub fn history(&self, user_id: UserId, limit: Option<usize>) -> Vec<Entry> {
        let inner = self.inner.lock();
        let history = match inner.conversations.get(&user_id) {
            Some(h) => h,
            None => return Vec::new(),
        };

        match limit {
            Some(n) if n < history.len() => history[history.len() - n..].to_vec(),
            _ => history.clone(),
        }
    }

    /// Remove a user's history and activity record. Idempotent.
    pub fn clear(&self, user_id: UserId) {
        let mut inner = self.inner.lock();
        if inner.conversations.remove(&user_id).is_some() {
            tracing::info!(user_id, "history cleared");
        }
        inner.last_activity.remove(&user_id);
    }

    /// True iff the user was active within the timeout window
    pub fn has_recent_activity(&self, user_id: UserId) -> bool {
        let now = self.clock.now();
        let inner = self.inner.lock();
        match inner.last_activity.get(&user_id) {
            Some(last) => now - *last < self.timeout,
            None => false,
        }
    }

    /// Compact "User:/Assistant:" preview of the last `last_n` entries
    pub fn context_summary(&self, user_id: UserId, last_n: usize) -> String {
        let history = self.history(user_id, Some(last_n));

        history
            .iter()
            .map(|entry| {
                let who = match entry.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                let preview: String = entry.content.chars().take(100).collect();
                if preview.len() < entry.content.len() {
                    format!("{}: {}...", who, preview)
                } else {
                    format!("{}: {}", who, preview)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Counters across all live conversations
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            active_users: inner.conversations.len(),
            total_messages: inner.conversations.values().map(Vec::len).sum(),
        }
    }

    /// Drop every user whose last activity is older than the timeout.
    fn sweep(inner: &mut Inner, now: DateTime<Utc>, timeout: Duration) {
        let expired: Vec<UserId> = inner
            .last_activity
            .iter()
            .filter(|(_, last)| now - **last > timeout)
            .map(|(id, _)| *id)
            .collect();

        for user_id in expired {
            inner.conversations.remove(&user_id);
            inner.last_activity.remove(&user_id);
            tracing::info!(user_id, "expired conversation evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A clock whose time is advanced by hand.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Utc::now()),
            })
        }

        fn advance_minutes(&self, minutes: i64) {
            let mut now = self.now.lock();
            *now += Duration::minutes(minutes);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn store() -> (ConversationStore, Arc<ManualClock>) {
        let clock = ManualClock::new();
        (ConversationStore::with_clock(10, 30, clock.clone()), clock)
    }

    #[test]
    fn test_append_then_history() {
        let (store, _) = store();
        store.append(1, Role::User, "hola");
        store.append(1, Role::Assistant, "¡hola!");

        let history = store.history(1, None);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "¡hola!");
    }

    #[test]
    fn test_history_unknown_user_empty() {
        let (store, _) = store();
        assert!(store.history(42, None).is_empty());
    }

    #[test]
    fn test_history_limit_takes_tail() {
        let (store, _) = store();
        for i in 0..6 {
            store.append(1, Role::User, format!("msg {}", i));
        }

        let tail = store.history(1, Some(2));
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "msg 4");
        assert_eq!(tail[1].content, "msg 5");
    }

    #[test]
    fn test_history_capped_at_double_max() {
        let (store, _) = store();
        // 25 appends against a cap of 2 * 10 = 20
        for i in 0..25 {
            store.append(1, Role::User, format!("msg {}", i));
        }

        let history = store.history(1, None);
        assert_eq!(history.len(), 20);
        // Most recent entries survive, in arrival order
        assert_eq!(history[0].content, "msg 5");
        assert_eq!(history[19].content, "msg 24");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (store, _) = store();
        store.append(1, Role::User, "hola");
        store.clear(1);
        assert!(store.history(1, None).is_empty());
        // Clearing again (and clearing a never-seen user) is a no-op
        store.clear(1);
        store.clear(999);
    }

    #[test]
    fn test_has_recent_activity() {
        let (store, clock) = store();
        assert!(!store.has_recent_activity(1));

        store.append(1, Role::User, "hola");
        assert!(store.has_recent_activity(1));

        clock.advance_minutes(29);
        assert!(store.has_recent_activity(1));

        clock.advance_minutes(2);
        assert!(!store.has_recent_activity(1));
    }

    #[test]
    fn test_eviction_happens_on_next_append() {
        let (store, clock) = store();
        store.append(1, Role::User, "hola");
        store.append(1, Role::Assistant, "¡hola!");

        clock.advance_minutes(31);

        // No append yet: the stale history is still readable
        assert_eq!(store.history(1, None).len(), 2);

        // An append for a *different* user triggers the sweep
        store.append(2, Role::User, "hey");
        assert!(store.history(1, None).is_empty());
        assert!(!store.has_recent_activity(1));
    }

    #[test]
    fn test_eviction_after_inactivity_then_new_message() {
        // One exchange, 31 minutes of silence, then the same user returns.
        let (store, clock) = store();
        store.append(7, Role::User, "convierte 100 USD EUR");
        store.append(7, Role::Assistant, "100 USD = 92 EUR");

        clock.advance_minutes(31);

        // The next append sweeps the stale history before recording
        store.append(7, Role::User, "hola de nuevo");
        let history = store.history(7, None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hola de nuevo");
    }

    #[test]
    fn test_context_summary_truncates() {
        let (store, _) = store();
        store.append(1, Role::User, "a".repeat(150));
        store.append(1, Role::Assistant, "short");

        let summary = store.context_summary(1, 4);
        assert!(summary.starts_with("User: "));
        assert!(summary.contains("..."));
        assert!(summary.ends_with("Assistant: short"));
    }

    #[test]
    fn test_stats() {
        let (store, _) = store();
        store.append(1, Role::User, "a");
        store.append(1, Role::Assistant, "b");
        store.append(2, Role::User, "c");

        let stats = store.stats();
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.total_messages, 3);
    }
}
