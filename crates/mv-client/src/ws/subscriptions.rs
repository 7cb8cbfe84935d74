//! Intended channel membership.
//!
//! The set records which channels the application *wants* to be subscribed
//! to, independent of whether a connection currently exists. The connection
//! manager reads a snapshot at open time to bring the server in sync.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    inner: Arc<Mutex<BTreeSet<String>>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record intent to be subscribed. Returns false if already present.
    pub fn add(&self, channel: &str) -> bool {
        self.inner.lock().unwrap().insert(channel.to_string())
    }

    /// Drop intent. Returns false if the channel was never in the set.
    pub fn remove(&self, channel: &str) -> bool {
        self.inner.lock().unwrap().remove(channel)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.inner.lock().unwrap().contains(channel)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// Point-in-time copy for subscription replay.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().unwrap().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_are_idempotent() {
        let set = SubscriptionSet::new();
        assert!(set.add("task:T1"));
        assert!(!set.add("task:T1"));
        assert_eq!(set.len(), 1);

        assert!(set.remove("task:T1"));
        assert!(!set.remove("task:T1"));
        assert!(set.is_empty());
    }

    #[test]
    fn snapshot_holds_one_entry_per_channel() {
        let set = SubscriptionSet::new();
        set.add("task:T1");
        set.add("task:T1");
        set.add("task:T2");
        set.add("rag:S1");
        set.remove("rag:S1");
        assert_eq!(set.snapshot(), vec!["task:T1", "task:T2"]);
    }

    #[test]
    fn clones_share_the_set() {
        let set = SubscriptionSet::new();
        let other = set.clone();
        set.add("task:T1");
        assert!(other.contains("task:T1"));
    }
}
