//! Typed message dispatch.
//!
//! Inbound frames fan out to every handler registered for their exact type,
//! then to wildcard handlers, in registration order. Handler failures are
//! logged and isolated; one bad listener never starves the rest. Handlers
//! are snapshotted before invocation, so a handler may register or drop
//! listeners (including itself) mid-dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use mv_protocol::ws::{MessageType, WsMessage};

pub type MessageHandler = Arc<dyn Fn(&WsMessage) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ListenerKey {
    Kind(MessageType),
    Any,
}

#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    listeners: Mutex<HashMap<ListenerKey, Vec<(u64, MessageHandler)>>>,
    next_id: AtomicU64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one message type. Dropping the returned guard
    /// removes exactly that handler.
    pub fn on(
        &self,
        kind: MessageType,
        handler: impl Fn(&WsMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ListenerGuard {
        self.register(ListenerKey::Kind(kind), Arc::new(handler))
    }

    /// Register a wildcard handler invoked for every dispatched message.
    pub fn on_any(
        &self,
        handler: impl Fn(&WsMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> ListenerGuard {
        self.register(ListenerKey::Any, Arc::new(handler))
    }

    fn register(&self, key: ListenerKey, handler: MessageHandler) -> ListenerGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push((id, handler));
        ListenerGuard {
            bus: self.clone(),
            key,
            id,
        }
    }

    fn remove(&self, key: ListenerKey, id: u64) {
        let mut map = self.inner.listeners.lock().unwrap();
        if let Some(list) = map.get_mut(&key) {
            list.retain(|(entry_id, _)| *entry_id != id);
            if list.is_empty() {
                map.remove(&key);
            }
        }
    }

    /// Deliver a message to type-specific handlers, then wildcard handlers.
    /// No reordering, no buffering, no deduplication.
    pub fn emit(&self, message: &WsMessage) {
        let handlers: Vec<MessageHandler> = {
            let map = self.inner.listeners.lock().unwrap();
            let mut snapshot = Vec::new();
            if let Some(list) = map.get(&ListenerKey::Kind(message.kind)) {
                snapshot.extend(list.iter().map(|(_, h)| Arc::clone(h)));
            }
            if let Some(list) = map.get(&ListenerKey::Any) {
                snapshot.extend(list.iter().map(|(_, h)| Arc::clone(h)));
            }
            snapshot
        };

        for handler in handlers {
            if let Err(e) = handler(message) {
                tracing::error!(kind = ?message.kind, error = %e, "message handler failed");
            }
        }
    }
}

/// Capability to remove one registered handler. Removal happens on drop and
/// is a no-op if the handler is already gone.
pub struct ListenerGuard {
    bus: MessageBus,
    key: ListenerKey,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.bus.remove(self.key, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use std::sync::Mutex as StdMutex;

    fn task_progress_message() -> WsMessage {
        let mut data = Map::new();
        data.insert("task_id".to_string(), json!("T1"));
        WsMessage::new(MessageType::TaskProgress, data)
    }

    #[test]
    fn failing_handler_does_not_block_later_handlers() {
        let bus = MessageBus::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let first = bus.on(MessageType::TaskProgress, |_| {
            anyhow::bail!("first handler exploded")
        });
        let seen_second = Arc::clone(&seen);
        let second = bus.on(MessageType::TaskProgress, move |msg| {
            seen_second.lock().unwrap().push(msg.clone());
            Ok(())
        });

        bus.emit(&task_progress_message());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, MessageType::TaskProgress);
        drop(first);
        drop(second);
    }

    #[test]
    fn handlers_run_in_registration_order_then_wildcards() {
        let bus = MessageBus::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let guards: Vec<ListenerGuard> = vec![
            {
                let order = Arc::clone(&order);
                bus.on(MessageType::TaskProgress, move |_| {
                    order.lock().unwrap().push("typed-1");
                    Ok(())
                })
            },
            {
                let order = Arc::clone(&order);
                bus.on_any(move |_| {
                    order.lock().unwrap().push("wildcard");
                    Ok(())
                })
            },
            {
                let order = Arc::clone(&order);
                bus.on(MessageType::TaskProgress, move |_| {
                    order.lock().unwrap().push("typed-2");
                    Ok(())
                })
            },
        ];

        bus.emit(&task_progress_message());
        assert_eq!(
            *order.lock().unwrap(),
            vec!["typed-1", "typed-2", "wildcard"]
        );
        drop(guards);
    }

    #[test]
    fn dropping_a_guard_removes_exactly_that_handler() {
        let bus = MessageBus::new();
        let count = Arc::new(StdMutex::new(0u32));

        let count_a = Arc::clone(&count);
        let a = bus.on(MessageType::Notification, move |_| {
            *count_a.lock().unwrap() += 1;
            Ok(())
        });
        let count_b = Arc::clone(&count);
        let _b = bus.on(MessageType::Notification, move |_| {
            *count_b.lock().unwrap() += 10;
            Ok(())
        });

        drop(a);
        bus.emit(&WsMessage::new(MessageType::Notification, Map::new()));
        assert_eq!(*count.lock().unwrap(), 10);
    }

    #[test]
    fn handler_may_unregister_itself_during_dispatch() {
        let bus = MessageBus::new();
        let slot: Arc<StdMutex<Option<ListenerGuard>>> = Arc::new(StdMutex::new(None));
        let calls = Arc::new(StdMutex::new(0u32));

        let slot_inner = Arc::clone(&slot);
        let calls_inner = Arc::clone(&calls);
        let guard = bus.on(MessageType::Notification, move |_| {
            *calls_inner.lock().unwrap() += 1;
            // one-shot: remove ourselves on first delivery
            slot_inner.lock().unwrap().take();
            Ok(())
        });
        *slot.lock().unwrap() = Some(guard);

        let msg = WsMessage::new(MessageType::Notification, Map::new());
        bus.emit(&msg);
        bus.emit(&msg);
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
