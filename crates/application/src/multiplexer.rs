//! Subscription multiplexer.
//!
//! Maintains exactly one live store subscription per observed path and fans
//! every snapshot out to all local listeners. Handles own their registration:
//! dropping the last handle for a path tears the underlying subscription
//! down on every exit path, so a view that stops observing can never leak a
//! subscription or leave a stale notifier behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracklet_core::AppResult;

use crate::store_ports::{RealtimeStore, StoreEvent, StorePath};

struct Listener {
    id: u64,
    sender: mpsc::UnboundedSender<StoreEvent>,
}

struct Topic {
    listeners: Arc<Mutex<Vec<Listener>>>,
    next_listener: u64,
    pump: JoinHandle<()>,
}

/// Fans store subscriptions out to any number of local listeners.
pub struct SubscriptionMultiplexer {
    store: Arc<dyn RealtimeStore>,
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl SubscriptionMultiplexer {
    /// Creates a multiplexer over a realtime store.
    #[must_use]
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            store,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribes to every mutation at or below a path.
    ///
    /// The first listener for a path opens the store subscription; later
    /// listeners share it. Each listener gets its own unbounded channel, so
    /// a slow listener still receives every snapshot in arrival order and
    /// never stalls its siblings. One topic's store failure never affects
    /// other topics.
    pub async fn subscribe(&self, prefix: &StorePath) -> AppResult<SubscriptionHandle> {
        let key = prefix.as_str().to_owned();

        if let Some(handle) = self.attach_to_existing(&key) {
            return Ok(handle);
        }

        // Not yet observed: open the store subscription before touching the
        // map again so the lock is never held across an await.
        let mut events = self.store.subscribe(prefix).await?;

        let mut topics = lock(&self.topics);
        if topics.contains_key(&key) {
            // A concurrent caller opened the topic first; the extra store
            // subscription unsubscribes when `events` drops here.
            drop(topics);
            if let Some(handle) = self.attach_to_existing(&key) {
                return Ok(handle);
            }
            topics = lock(&self.topics);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let listeners = Arc::new(Mutex::new(vec![Listener { id: 0, sender }]));

        let pump_listeners = Arc::clone(&listeners);
        let pump_key = key.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let mut listeners = lock(&pump_listeners);
                listeners.retain(|listener| listener.sender.send(event.clone()).is_ok());
            }
            tracing::debug!(topic = %pump_key, "store subscription ended");
        });

        topics.insert(
            key.clone(),
            Topic {
                listeners,
                next_listener: 1,
                pump,
            },
        );

        Ok(SubscriptionHandle {
            receiver,
            _guard: TopicGuard {
                key,
                listener_id: 0,
                topics: Arc::clone(&self.topics),
            },
        })
    }

    /// Returns how many paths currently hold a live store subscription.
    #[must_use]
    pub fn active_topics(&self) -> usize {
        lock(&self.topics).len()
    }

    fn attach_to_existing(&self, key: &str) -> Option<SubscriptionHandle> {
        let mut topics = lock(&self.topics);
        topics.get_mut(key).map(|topic| {
            let listener_id = topic.next_listener;
            topic.next_listener += 1;

            let (sender, receiver) = mpsc::unbounded_channel();
            lock(&topic.listeners).push(Listener {
                id: listener_id,
                sender,
            });

            SubscriptionHandle {
                receiver,
                _guard: TopicGuard {
                    key: key.to_owned(),
                    listener_id,
                    topics: Arc::clone(&self.topics),
                },
            }
        })
    }
}

/// A listener's handle on one multiplexed subscription.
///
/// Dropping the handle releases the registration; when the last handle for a
/// path drops, the underlying store subscription is torn down.
pub struct SubscriptionHandle {
    receiver: mpsc::UnboundedReceiver<StoreEvent>,
    _guard: TopicGuard,
}

impl SubscriptionHandle {
    /// Receives the next snapshot event, `None` once the topic is gone.
    ///
    /// Delivery is at-least-once in arrival order: every snapshot the store
    /// emitted while this handle was live arrives, however slowly the
    /// listener drains them.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.receiver.recv().await
    }
}

struct TopicGuard {
    key: String,
    listener_id: u64,
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl Drop for TopicGuard {
    fn drop(&mut self) {
        let mut topics = lock(&self.topics);
        let empty = match topics.get_mut(&self.key) {
            Some(topic) => {
                let mut listeners = lock(&topic.listeners);
                listeners.retain(|listener| listener.id != self.listener_id);
                listeners.is_empty()
            }
            None => false,
        };

        if empty {
            if let Some(topic) = topics.remove(&self.key) {
                topic.pump.abort();
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use tokio::sync::{Mutex, mpsc};
    use tracklet_core::{AppResult, ProjectId};

    use crate::store_ports::{RealtimeStore, StoreEvent, StoreEventKind, StoreEvents, StorePath};

    use super::SubscriptionMultiplexer;

    /// Store fake whose event flow is driven by the test.
    #[derive(Default)]
    struct ScriptedStore {
        subscriptions: Mutex<Vec<(String, mpsc::UnboundedSender<StoreEvent>)>>,
        opened: AtomicUsize,
    }

    impl ScriptedStore {
        async fn emit(&self, path: StorePath, value: Value) {
            let event = StoreEvent {
                path,
                kind: StoreEventKind::Updated,
                value,
            };
            let subscriptions = self.subscriptions.lock().await;
            for (prefix, sender) in subscriptions.iter() {
                if path_matches(prefix, event.path.as_str()) {
                    let _ = sender.send(event.clone());
                }
            }
        }

        async fn live_subscriptions(&self) -> usize {
            self.subscriptions
                .lock()
                .await
                .iter()
                .filter(|(_, sender)| !sender.is_closed())
                .count()
        }
    }

    fn path_matches(prefix: &str, path: &str) -> bool {
        path == prefix || path.starts_with(&format!("{prefix}/"))
    }

    #[async_trait]
    impl RealtimeStore for ScriptedStore {
        async fn write(&self, _path: &StorePath, _value: Value) -> AppResult<()> {
            Ok(())
        }

        async fn update(&self, _path: &StorePath, _fields: Map<String, Value>) -> AppResult<()> {
            Ok(())
        }

        async fn append(&self, _path: &StorePath, _value: Value) -> AppResult<()> {
            Ok(())
        }

        async fn read(&self, _path: &StorePath) -> AppResult<Option<Value>> {
            Ok(None)
        }

        async fn subscribe(&self, prefix: &StorePath) -> AppResult<StoreEvents> {
            let (sender, receiver) = mpsc::unbounded_channel();
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.subscriptions
                .lock()
                .await
                .push((prefix.as_str().to_owned(), sender));
            Ok(receiver)
        }
    }

    #[tokio::test]
    async fn listeners_on_one_path_share_one_store_subscription() {
        let store = Arc::new(ScriptedStore::default());
        let multiplexer = SubscriptionMultiplexer::new(store.clone());
        let bugs = StorePath::project_bugs(ProjectId::new());

        let mut first = multiplexer.subscribe(&bugs).await.unwrap_or_else(|_| panic!("test"));
        let mut second = multiplexer.subscribe(&bugs).await.unwrap_or_else(|_| panic!("test"));

        assert_eq!(store.opened.load(Ordering::SeqCst), 1);
        assert_eq!(multiplexer.active_topics(), 1);

        store.emit(bugs.clone(), json!({"seen": true})).await;

        let first_event = first.recv().await;
        let second_event = second.recv().await;
        assert!(first_event.is_some());
        assert!(second_event.is_some());
    }

    #[tokio::test]
    async fn distinct_paths_get_distinct_subscriptions() {
        let store = Arc::new(ScriptedStore::default());
        let multiplexer = SubscriptionMultiplexer::new(store.clone());

        let left = StorePath::project_bugs(ProjectId::new());
        let right = StorePath::project_bugs(ProjectId::new());

        let _left_handle = multiplexer.subscribe(&left).await.unwrap_or_else(|_| panic!("test"));
        let _right_handle = multiplexer.subscribe(&right).await.unwrap_or_else(|_| panic!("test"));

        assert_eq!(store.opened.load(Ordering::SeqCst), 2);
        assert_eq!(multiplexer.active_topics(), 2);
    }

    #[tokio::test]
    async fn last_handle_drop_tears_the_topic_down() {
        let store = Arc::new(ScriptedStore::default());
        let multiplexer = SubscriptionMultiplexer::new(store.clone());
        let bugs = StorePath::project_bugs(ProjectId::new());

        let first = multiplexer.subscribe(&bugs).await.unwrap_or_else(|_| panic!("test"));
        let second = multiplexer.subscribe(&bugs).await.unwrap_or_else(|_| panic!("test"));

        drop(first);
        assert_eq!(multiplexer.active_topics(), 1);

        drop(second);
        assert_eq!(multiplexer.active_topics(), 0);

        // The pump owns the store receiver; once aborted the sender closes.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(store.live_subscriptions().await, 0);
    }

    #[tokio::test]
    async fn events_arrive_in_order_per_subscription() {
        let store = Arc::new(ScriptedStore::default());
        let multiplexer = SubscriptionMultiplexer::new(store.clone());
        let bugs = StorePath::project_bugs(ProjectId::new());

        let mut handle = multiplexer.subscribe(&bugs).await.unwrap_or_else(|_| panic!("test"));

        for sequence in 0..5 {
            store.emit(bugs.clone(), json!({ "sequence": sequence })).await;
        }

        for expected in 0..5 {
            let event = handle.recv().await;
            let sequence = event
                .and_then(|event| event.value.get("sequence").cloned())
                .and_then(|value| value.as_i64());
            assert_eq!(sequence, Some(expected));
        }
    }

    #[tokio::test]
    async fn slow_listener_still_receives_every_snapshot() {
        let store = Arc::new(ScriptedStore::default());
        let multiplexer = SubscriptionMultiplexer::new(store.clone());
        let bugs = StorePath::project_bugs(ProjectId::new());

        let mut slow = multiplexer.subscribe(&bugs).await.unwrap_or_else(|_| panic!("test"));

        // Far more events than any fixed fan-out buffer before the listener
        // polls even once.
        for sequence in 0..300 {
            store.emit(bugs.clone(), json!({ "sequence": sequence })).await;
        }
        tokio::task::yield_now().await;

        for expected in 0..300 {
            let event = slow.recv().await;
            let sequence = event
                .and_then(|event| event.value.get("sequence").cloned())
                .and_then(|value| value.as_i64());
            assert_eq!(sequence, Some(expected));
        }
    }
}
