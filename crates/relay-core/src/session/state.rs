use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Records which session ids have already been established with the assistant.
///
/// The first turn of a session creates it (`--session-id`); every later turn
/// must resume it (`--resume`). A tracker is cheap to clone and every clone
/// shares the same set, so the executor and the orchestrator can each hold one.
///
/// Entries are never evicted: the set only holds ids of conversations started
/// or resumed during this process's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SessionStateTracker {
    established: Arc<RwLock<HashSet<String>>>,
}

impl SessionStateTracker {
    /// Creates a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a session id as established.
    ///
    /// Called after a successful turn, or directly when a session is known to
    /// exist already (e.g. resumed from the transcript store).
    pub async fn mark_established(&self, session_id: &str) {
        let mut established = self.established.write().await;
        established.insert(session_id.to_string());
    }

    /// Returns true if a turn for `session_id` already succeeded.
    pub async fn is_established(&self, session_id: &str) -> bool {
        let established = self.established.read().await;
        established.contains(session_id)
    }

    /// Forgets a session id, so the next turn with it creates a new session.
    pub async fn forget(&self, session_id: &str) {
        let mut established = self.established.write().await;
        established.remove(session_id);
    }

    /// Number of established sessions.
    pub async fn len(&self) -> usize {
        self.established.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.established.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_and_forget() {
        let tracker = SessionStateTracker::new();
        assert!(!tracker.is_established("s1").await);

        tracker.mark_established("s1").await;
        assert!(tracker.is_established("s1").await);
        assert!(!tracker.is_established("s2").await);

        tracker.forget("s1").await;
        assert!(!tracker.is_established("s1").await);
        assert!(tracker.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let tracker = SessionStateTracker::new();
        let clone = tracker.clone();

        clone.mark_established("shared").await;
        assert!(tracker.is_established("shared").await);
        assert_eq!(tracker.len().await, 1);
    }

    #[tokio::test]
    async fn test_independent_trackers_do_not_interfere() {
        let first = SessionStateTracker::new();
        let second = SessionStateTracker::new();

        first.mark_established("only-first").await;
        assert!(!second.is_established("only-first").await);
    }

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let tracker = SessionStateTracker::new();
        tracker.mark_established("s").await;
        tracker.mark_established("s").await;
        assert_eq!(tracker.len().await, 1);
    }
}
