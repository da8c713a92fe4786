use serde_json::{Map, Value};
use tokio::sync::{RwLock, mpsc};
use tracklet_application::{RealtimeStore, StoreEvent, StoreEventKind, StoreEvents, StorePath};
use tracklet_core::AppResult;

use async_trait::async_trait;

/// In-memory realtime store implementation.
///
/// One JSON tree guarded by a single lock. Every mutation and the fan-out of
/// its snapshot event happen under the same write guard, so each subscriber
/// observes mutations in the order they were applied. Updates are shallow
/// merges and appends are atomic, matching the port contract that concurrent
/// disjoint-field writes and concurrent appends all survive.
#[derive(Debug, Default)]
pub struct InMemoryRealtimeStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    root: Value,
    subscribers: Vec<Subscriber>,
}

#[derive(Debug)]
struct Subscriber {
    prefix: StorePath,
    sender: mpsc::UnboundedSender<StoreEvent>,
}

impl InMemoryRealtimeStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RealtimeStore for InMemoryRealtimeStore {
    async fn write(&self, path: &StorePath, value: Value) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let kind = event_kind(node_at(&inner.root, path));
        *ensure_node(&mut inner.root, &path.segments()) = value.clone();

        emit(&mut inner.subscribers, path, kind, value);
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let kind = event_kind(node_at(&inner.root, path));
        let node = ensure_node(&mut inner.root, &path.segments());
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            for (key, value) in fields {
                map.insert(key, value);
            }
        }

        let merged = node.clone();
        emit(&mut inner.subscribers, path, kind, merged);
        Ok(())
    }

    async fn append(&self, path: &StorePath, value: Value) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let kind = event_kind(node_at(&inner.root, path));
        let node = ensure_node(&mut inner.root, &path.segments());
        if !node.is_array() {
            *node = Value::Array(Vec::new());
        }
        if let Value::Array(items) = node {
            items.push(value);
        }

        let appended = node.clone();
        emit(&mut inner.subscribers, path, kind, appended);
        Ok(())
    }

    async fn read(&self, path: &StorePath) -> AppResult<Option<Value>> {
        let guard = self.inner.read().await;
        Ok(node_at(&guard.root, path).cloned())
    }

    async fn subscribe(&self, prefix: &StorePath) -> AppResult<StoreEvents> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.write().await.subscribers.push(Subscriber {
            prefix: prefix.clone(),
            sender,
        });
        Ok(receiver)
    }
}

fn event_kind(existing: Option<&Value>) -> StoreEventKind {
    match existing {
        Some(_) => StoreEventKind::Updated,
        None => StoreEventKind::Added,
    }
}

fn node_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn ensure_node<'a>(node: &'a mut Value, segments: &[&str]) -> &'a mut Value {
    let Some((first, rest)) = segments.split_first() else {
        return node;
    };

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            let child = map.entry((*first).to_owned()).or_insert(Value::Null);
            ensure_node(child, rest)
        }
        other => other,
    }
}

fn emit(subscribers: &mut Vec<Subscriber>, path: &StorePath, kind: StoreEventKind, value: Value) {
    let event = StoreEvent {
        path: path.clone(),
        kind,
        value,
    };

    subscribers.retain(|subscriber| {
        if subscriber.prefix.depth_below(&event.path).is_none() {
            return !subscriber.sender.is_closed();
        }
        subscriber.sender.send(event.clone()).is_ok()
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;
    use tracklet_application::{RealtimeStore, StoreEventKind, StorePath};
    use tracklet_core::{BugId, ProjectId};
    use tracklet_domain::{Bug, Severity};

    use super::InMemoryRealtimeStore;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = InMemoryRealtimeStore::new();
        let path = StorePath::project(ProjectId::new());

        store
            .write(&path, json!({"name": "Apollo"}))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let value = store.read(&path).await.unwrap_or_else(|_| panic!("test"));
        assert_eq!(value, Some(json!({"name": "Apollo"})));
        assert_eq!(
            store.read(&StorePath::project(ProjectId::new())).await.unwrap_or_else(|_| panic!("test")),
            None
        );
    }

    #[tokio::test]
    async fn bug_document_round_trips_field_for_field() {
        let store = InMemoryRealtimeStore::new();
        let bug = Bug::new(
            "Login fails",
            "500 on submit",
            Severity::High,
            "developer1@x.com",
            "qa1@x.com",
            Utc::now(),
        )
        .unwrap_or_else(|_| panic!("test"));
        let path = StorePath::bug(ProjectId::new(), bug.id);

        let document = serde_json::to_value(&bug).unwrap_or_else(|_| panic!("test"));
        store.write(&path, document).await.unwrap_or_else(|_| panic!("test"));

        let stored = store
            .read(&path)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_default();
        let reloaded: Bug = serde_json::from_value(stored).unwrap_or_else(|_| panic!("test"));
        assert_eq!(reloaded, bug);
    }

    #[tokio::test]
    async fn concurrent_disjoint_updates_both_survive() {
        let store = Arc::new(InMemoryRealtimeStore::new());
        let path = StorePath::bug(ProjectId::new(), BugId::new());
        store
            .write(&path, json!({"status": "open", "assignee": ""}))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let status_writer = {
            let store = Arc::clone(&store);
            let path = path.clone();
            tokio::spawn(async move {
                store
                    .update(&path, fields(&[("status", json!("in-progress"))]))
                    .await
            })
        };
        let assignee_writer = {
            let store = Arc::clone(&store);
            let path = path.clone();
            tokio::spawn(async move {
                store
                    .update(&path, fields(&[("assignee", json!("developer1@x.com"))]))
                    .await
            })
        };

        let first = status_writer.await;
        let second = assignee_writer.await;
        assert!(first.is_ok());
        assert!(second.is_ok());

        let value = store
            .read(&path)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_default();
        assert_eq!(value.get("status"), Some(&json!("in-progress")));
        assert_eq!(value.get("assignee"), Some(&json!("developer1@x.com")));
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let store = Arc::new(InMemoryRealtimeStore::new());
        let path = StorePath::bug_attachments(ProjectId::new(), BugId::new());

        let mut writers = Vec::new();
        for index in 0..8 {
            let store = Arc::clone(&store);
            let path = path.clone();
            writers.push(tokio::spawn(async move {
                store.append(&path, json!(format!("url-{index}"))).await
            }));
        }
        for writer in writers {
            assert!(writer.await.is_ok());
        }

        let value = store
            .read(&path)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_default();
        assert_eq!(value.as_array().map(Vec::len), Some(8));
    }

    #[tokio::test]
    async fn first_write_is_added_and_second_is_updated() {
        let store = InMemoryRealtimeStore::new();
        let project_id = ProjectId::new();
        let bug_id = BugId::new();
        let bugs = StorePath::project_bugs(project_id);
        let bug = StorePath::bug(project_id, bug_id);

        let mut events = store
            .subscribe(&bugs)
            .await
            .unwrap_or_else(|_| panic!("test"));

        store
            .write(&bug, json!({"title": "Crash"}))
            .await
            .unwrap_or_else(|_| panic!("test"));
        store
            .update(&bug, fields(&[("title", json!("Crash on save"))]))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let added = events.recv().await;
        assert_eq!(added.as_ref().map(|event| event.kind), Some(StoreEventKind::Added));

        let updated = events.recv().await;
        assert_eq!(updated.as_ref().map(|event| event.kind), Some(StoreEventKind::Updated));
        assert_eq!(
            updated.map(|event| event.value),
            Some(json!({"title": "Crash on save"}))
        );
    }

    #[tokio::test]
    async fn subscription_sees_no_replay_and_only_its_prefix() {
        let store = InMemoryRealtimeStore::new();
        let watched = ProjectId::new();
        let other = ProjectId::new();

        store
            .write(&StorePath::project(watched), json!({"name": "before"}))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let mut events = store
            .subscribe(&StorePath::project_bugs(watched))
            .await
            .unwrap_or_else(|_| panic!("test"));

        store
            .write(&StorePath::bug(other, BugId::new()), json!({"title": "elsewhere"}))
            .await
            .unwrap_or_else(|_| panic!("test"));
        store
            .write(&StorePath::bug(watched, BugId::new()), json!({"title": "here"}))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let event = events.recv().await;
        assert_eq!(
            event.map(|event| event.value),
            Some(json!({"title": "here"}))
        );
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_next_mutation() {
        let store = InMemoryRealtimeStore::new();
        let path = StorePath::projects();

        let events = store
            .subscribe(&path)
            .await
            .unwrap_or_else(|_| panic!("test"));
        drop(events);

        let result = store
            .write(&StorePath::project(ProjectId::new()), json!({"name": "Apollo"}))
            .await;
        assert!(result.is_ok());
        assert_eq!(store.inner.read().await.subscribers.len(), 0);
    }
}
