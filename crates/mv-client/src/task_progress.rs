//! Per-task progress projection.
//!
//! Each task lifecycle frame is projected into a fresh snapshot — replace,
//! never merge — so a consumer always sees exactly what the latest frame
//! said. The watcher wires one task's channel subscription and its five
//! lifecycle listeners together and publishes snapshots over a
//! `tokio::sync::watch` channel.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::watch;

use mv_protocol::ws::{MessageType, WsMessage};

use crate::ws::{ChannelGuard, ListenerGuard, WsClient};

/// Snapshot of one task's state as of the latest lifecycle frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    pub task_id: String,
    pub status: String,
    /// Percentage in 0..=100 as reported by the server.
    pub progress: f64,
    pub message: String,
    /// Full payload of the frame, for fields the snapshot doesn't model.
    pub details: Map<String, Value>,
    pub is_complete: bool,
    pub is_failed: bool,
}

impl TaskProgress {
    /// Project a lifecycle frame for `task_id`. Returns `None` when the
    /// frame carries no matching `task_id`.
    pub fn from_message(task_id: &str, message: &WsMessage) -> Option<Self> {
        let frame_task_id = message.data.get("task_id").and_then(Value::as_str)?;
        if frame_task_id != task_id {
            return None;
        }
        Some(Self {
            task_id: frame_task_id.to_string(),
            status: message
                .data
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            progress: message
                .data
                .get("progress")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            message: message
                .data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            details: message.data.clone(),
            is_complete: message.kind == MessageType::TaskCompleted,
            is_failed: matches!(
                message.kind,
                MessageType::TaskFailed | MessageType::TaskCancelled
            ),
        })
    }

    /// Terminal one way or the other.
    pub fn is_finished(&self) -> bool {
        self.is_complete || self.is_failed
    }
}

const LIFECYCLE_KINDS: [MessageType; 5] = [
    MessageType::TaskStarted,
    MessageType::TaskProgress,
    MessageType::TaskCompleted,
    MessageType::TaskFailed,
    MessageType::TaskCancelled,
];

struct ActiveWatch {
    _channel: ChannelGuard,
    _listeners: Vec<ListenerGuard>,
}

/// Follows one task at a time. Retargeting releases the previous task's
/// subscription and listeners before the new ones are installed, so a
/// late frame for the old task can never leak into the new projection.
pub struct TaskProgressWatcher {
    client: WsClient,
    tx: Arc<watch::Sender<Option<TaskProgress>>>,
    active: Mutex<Option<ActiveWatch>>,
}

impl TaskProgressWatcher {
    pub fn new(client: WsClient) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            client,
            tx: Arc::new(tx),
            active: Mutex::new(None),
        }
    }

    /// Point the watcher at a task (or at nothing). The published snapshot
    /// resets to `None` immediately; subsequent frames for the task replace
    /// it wholesale.
    pub fn set_task(&self, task_id: Option<&str>) {
        // Old guards go first so their channel unsubscribe precedes the
        // new subscribe when retargeting within the same channel namespace.
        self.active.lock().unwrap().take();
        self.tx.send_replace(None);

        let Some(task_id) = task_id else { return };

        let channel = self.client.subscribe_to_task(task_id);
        let listeners = LIFECYCLE_KINDS
            .iter()
            .map(|kind| {
                let task_id = task_id.to_string();
                let tx = Arc::clone(&self.tx);
                self.client.on(*kind, move |message| {
                    if let Some(snapshot) = TaskProgress::from_message(&task_id, message) {
                        tx.send_replace(Some(snapshot));
                    }
                    Ok(())
                })
            })
            .collect();

        *self.active.lock().unwrap() = Some(ActiveWatch {
            _channel: channel,
            _listeners: listeners,
        });
    }

    /// Subscribe to projected snapshots. `None` until the watched task's
    /// first lifecycle frame arrives.
    pub fn watch(&self) -> watch::Receiver<Option<TaskProgress>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<TaskProgress> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use crate::ws::WsConfig;
    use serde_json::json;

    fn frame(kind: MessageType, data: Value) -> WsMessage {
        let Value::Object(map) = data else {
            panic!("test data must be an object")
        };
        WsMessage::new(kind, map)
    }

    fn test_client() -> WsClient {
        WsClient::new(WsConfig::new("ws://127.0.0.1:1/ws"), TokenStore::in_memory())
    }

    #[test]
    fn projection_fills_defaults_for_missing_fields() {
        let msg = frame(MessageType::TaskProgress, json!({ "task_id": "T1" }));
        let p = TaskProgress::from_message("T1", &msg).unwrap();
        assert_eq!(p.status, "unknown");
        assert_eq!(p.progress, 0.0);
        assert_eq!(p.message, "");
        assert!(!p.is_complete);
        assert!(!p.is_failed);
    }

    #[test]
    fn projection_ignores_other_tasks_and_missing_ids() {
        let other = frame(MessageType::TaskProgress, json!({ "task_id": "T2" }));
        assert!(TaskProgress::from_message("T1", &other).is_none());

        let anonymous = frame(MessageType::TaskProgress, json!({ "progress": 50 }));
        assert!(TaskProgress::from_message("T1", &anonymous).is_none());
    }

    #[test]
    fn terminal_flags_follow_frame_kind() {
        let done = frame(MessageType::TaskCompleted, json!({ "task_id": "T1" }));
        let p = TaskProgress::from_message("T1", &done).unwrap();
        assert!(p.is_complete && !p.is_failed && p.is_finished());

        let failed = frame(MessageType::TaskFailed, json!({ "task_id": "T1" }));
        let p = TaskProgress::from_message("T1", &failed).unwrap();
        assert!(!p.is_complete && p.is_failed);

        let cancelled = frame(MessageType::TaskCancelled, json!({ "task_id": "T1" }));
        let p = TaskProgress::from_message("T1", &cancelled).unwrap();
        assert!(!p.is_complete && p.is_failed);
    }

    #[test]
    fn snapshots_replace_rather_than_merge() {
        let first = frame(
            MessageType::TaskProgress,
            json!({ "task_id": "T1", "status": "processing", "progress": 40, "message": "parsing" }),
        );
        let second = frame(
            MessageType::TaskProgress,
            json!({ "task_id": "T1", "progress": 60 }),
        );

        let p1 = TaskProgress::from_message("T1", &first).unwrap();
        assert_eq!(p1.status, "processing");
        assert_eq!(p1.message, "parsing");

        // Later frame omits status/message; the projection must not carry
        // the earlier values forward.
        let p2 = TaskProgress::from_message("T1", &second).unwrap();
        assert_eq!(p2.progress, 60.0);
        assert_eq!(p2.status, "unknown");
        assert_eq!(p2.message, "");
    }

    #[tokio::test]
    async fn watcher_publishes_matching_frames_only() {
        let client = test_client();
        let watcher = TaskProgressWatcher::new(client.clone());
        watcher.set_task(Some("T1"));
        let rx = watcher.watch();

        client.emit(&frame(
            MessageType::TaskProgress,
            json!({ "task_id": "T2", "progress": 10 }),
        ));
        assert!(rx.borrow().is_none());

        client.emit(&frame(
            MessageType::TaskProgress,
            json!({ "task_id": "T1", "progress": 25, "status": "processing" }),
        ));
        let current = rx.borrow().clone().unwrap();
        assert_eq!(current.progress, 25.0);
        assert_eq!(current.status, "processing");
    }

    #[tokio::test]
    async fn retargeting_drops_old_listeners_and_resets() {
        let client = test_client();
        let watcher = TaskProgressWatcher::new(client.clone());
        watcher.set_task(Some("T1"));

        client.emit(&frame(
            MessageType::TaskProgress,
            json!({ "task_id": "T1", "progress": 50 }),
        ));
        assert!(watcher.current().is_some());
        assert!(client.subscribed_channels().contains(&"task:T1".to_string()));

        watcher.set_task(Some("T2"));
        assert!(watcher.current().is_none());
        assert_eq!(client.subscribed_channels(), vec!["task:T2"]);

        // A straggler for the old task is no longer projected
        client.emit(&frame(
            MessageType::TaskProgress,
            json!({ "task_id": "T1", "progress": 99 }),
        ));
        assert!(watcher.current().is_none());

        watcher.set_task(None);
        assert!(client.subscribed_channels().is_empty());
    }
}
