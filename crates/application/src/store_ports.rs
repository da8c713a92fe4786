//! Realtime store port.
//!
//! The backing transport is an excluded collaborator: the core only assumes
//! a hierarchical document tree addressed by `/`-separated paths, per-key
//! last-write-wins, shallow-merge partial updates and live subscriptions.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracklet_core::{AppResult, BugId, ProjectId};

/// Hierarchical path addressing one node in the store tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(String);

impl StorePath {
    /// Root of the project collection.
    #[must_use]
    pub fn projects() -> Self {
        Self("projects".to_owned())
    }

    /// A project document.
    #[must_use]
    pub fn project(project_id: ProjectId) -> Self {
        Self(format!("projects/{project_id}"))
    }

    /// A project's membership map.
    #[must_use]
    pub fn project_members(project_id: ProjectId) -> Self {
        Self(format!("projects/{project_id}/members"))
    }

    /// A project's bug collection.
    #[must_use]
    pub fn project_bugs(project_id: ProjectId) -> Self {
        Self(format!("projects/{project_id}/bugs"))
    }

    /// A bug document.
    #[must_use]
    pub fn bug(project_id: ProjectId, bug_id: BugId) -> Self {
        Self(format!("projects/{project_id}/bugs/{bug_id}"))
    }

    /// A bug's attachment URL list.
    #[must_use]
    pub fn bug_attachments(project_id: ProjectId, bug_id: BugId) -> Self {
        Self(format!("projects/{project_id}/bugs/{bug_id}/attachments"))
    }

    /// Returns the raw path string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        self.0.split('/').collect()
    }

    /// Returns how many segments `other` sits below this path, if it does.
    ///
    /// `Some(0)` means the same node; `Some(1)` a direct child. Consumers
    /// diffing a collection use this to ignore sub-document events.
    #[must_use]
    pub fn depth_below(&self, other: &StorePath) -> Option<usize> {
        if other.0 == self.0 {
            return Some(0);
        }

        other
            .0
            .strip_prefix(&self.0)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|rest| rest.split('/').count())
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Discriminates a first write from a mutation of an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    /// The node did not exist before this mutation.
    Added,
    /// The node existed and was mutated.
    Updated,
}

/// A snapshot event delivered to subscribers.
///
/// `value` is the full node value after the mutation, so consumers never
/// need a follow-up read to interpret the event.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    /// Path of the mutated node.
    pub path: StorePath,
    /// Whether the node was created or mutated.
    pub kind: StoreEventKind,
    /// Full node value after the mutation.
    pub value: Value,
}

/// Receiver half of a live subscription.
///
/// Events arrive at least once, in arrival order per subscription; there is
/// no ordering guarantee across different subscriptions. Dropping the
/// receiver is the unsubscribe.
pub type StoreEvents = mpsc::UnboundedReceiver<StoreEvent>;

/// Port for the hierarchical realtime document store.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Writes the full value at a path, replacing any previous node.
    async fn write(&self, path: &StorePath, value: Value) -> AppResult<()>;

    /// Shallow-merges fields into the object node at a path.
    ///
    /// Correctness of concurrent lifecycle writes depends on this being a
    /// merge, never an overwrite: two clients updating disjoint fields of
    /// the same document must both survive.
    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> AppResult<()>;

    /// Atomically appends a value to the array node at a path.
    ///
    /// This closes the read-modify-write race of a client-side list append:
    /// concurrent appends must all land.
    async fn append(&self, path: &StorePath, value: Value) -> AppResult<()>;

    /// Reads the node at a path, `None` when absent.
    async fn read(&self, path: &StorePath) -> AppResult<Option<Value>>;

    /// Subscribes to every mutation at or below a path.
    ///
    /// No replay of existing nodes: only mutations after the call are
    /// delivered.
    async fn subscribe(&self, prefix: &StorePath) -> AppResult<StoreEvents>;
}
