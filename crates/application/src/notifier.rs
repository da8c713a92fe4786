//! Notification differ.
//!
//! Watches every project the signed-in user belongs to and alerts only on
//! externally-originated changes. The `created_by`/`updated_by` stamps the
//! lifecycle writes carry are what make this possible: without them a
//! watcher cannot tell a collaborator's change from an echo of its own
//! write, and would either spam the user or go silent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracklet_core::{AppResult, BugId, ProjectId, UserIdentity};
use tracklet_domain::{Bug, BugStatus, Notification, Project};

use crate::multiplexer::{SubscriptionHandle, SubscriptionMultiplexer};
use crate::retry;
use crate::store_ports::{RealtimeStore, StoreEventKind, StorePath};

/// Emits user-facing alerts for changes the user did not cause.
pub struct ChangeNotifier {
    store: Arc<dyn RealtimeStore>,
    multiplexer: Arc<SubscriptionMultiplexer>,
}

impl ChangeNotifier {
    /// Creates a notifier over a store and its multiplexer.
    #[must_use]
    pub fn new(store: Arc<dyn RealtimeStore>, multiplexer: Arc<SubscriptionMultiplexer>) -> Self {
        Self { store, multiplexer }
    }

    /// Starts watching every project the user is a member of.
    ///
    /// One project's subscription failure logs a warning and skips that
    /// project; the rest keep watching. Dropping the returned stream
    /// releases every underlying subscription, so a signed-out watcher
    /// cannot duplicate alerts after a re-mount.
    pub async fn watch(&self, user: &UserIdentity) -> AppResult<NotificationStream> {
        let projects_root = StorePath::projects();
        let snapshot = retry::with_backoff(|| self.store.read(&projects_root))
            .await?
            .unwrap_or_default();

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        let entries = snapshot.as_object().cloned().unwrap_or_default();
        for (raw_id, node) in entries {
            let project: Project = match serde_json::from_value(node) {
                Ok(project) => project,
                Err(error) => {
                    tracing::warn!(project = %raw_id, %error, "skipping malformed project document");
                    continue;
                }
            };

            if !project.is_member(user.email()) {
                continue;
            }

            let bugs_path = StorePath::project_bugs(project.id);
            let handle = match self.multiplexer.subscribe(&bugs_path).await {
                Ok(handle) => handle,
                Err(error) => {
                    tracing::warn!(project = %project.id, %error, "skipping notification watch for project");
                    continue;
                }
            };

            // Bugs that exist before the watch begins seed the diff state, so
            // a mid-life update is classified against what the bug looked
            // like, not treated as brand new.
            let seen = self.seed_bug_summaries(project.id, &bugs_path).await;

            tasks.push(spawn_project_differ(
                project.id,
                bugs_path,
                handle,
                seen,
                user.email().to_owned(),
                sender.clone(),
            ));
        }

        tracing::debug!(user = user.email(), projects = tasks.len(), "notification watch started");

        Ok(NotificationStream {
            receiver,
            tasks,
        })
    }

    async fn seed_bug_summaries(
        &self,
        project_id: ProjectId,
        bugs_path: &StorePath,
    ) -> HashMap<BugId, BugSummary> {
        let snapshot = match retry::with_backoff(|| self.store.read(bugs_path)).await {
            Ok(value) => value.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(project = %project_id, %error, "starting watch without bug history");
                return HashMap::new();
            }
        };

        let mut seen = HashMap::new();
        for (raw_id, node) in snapshot.as_object().cloned().unwrap_or_default() {
            match serde_json::from_value::<Bug>(node) {
                Ok(bug) => {
                    seen.insert(bug.id, BugSummary::of(&bug));
                }
                Err(error) => {
                    tracing::warn!(project = %project_id, bug = %raw_id, %error, "skipping malformed bug document");
                }
            }
        }
        seen
    }
}

/// The fields of a bug the differ compares across snapshots.
struct BugSummary {
    status: BugStatus,
    assignee: String,
    attachments: usize,
}

impl BugSummary {
    fn of(bug: &Bug) -> Self {
        Self {
            status: bug.status,
            assignee: bug.assignee.clone(),
            attachments: bug.attachments.len(),
        }
    }
}

fn spawn_project_differ(
    project_id: ProjectId,
    bugs_path: StorePath,
    mut handle: SubscriptionHandle,
    mut seen: HashMap<BugId, BugSummary>,
    observer_email: String,
    sender: mpsc::UnboundedSender<Notification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handle.recv().await {
            // Only direct children of the bug collection are bug documents;
            // sub-document events like the attachments array are not diffed.
            if bugs_path.depth_below(&event.path) != Some(1) {
                continue;
            }

            let bug: Bug = match serde_json::from_value(event.value) {
                Ok(bug) => bug,
                Err(error) => {
                    tracing::warn!(project = %project_id, %error, "ignoring malformed bug document");
                    continue;
                }
            };

            // The snapshot advances even for the observer's own writes, so a
            // later foreign change diffs against the current state.
            let prior = seen.insert(bug.id, BugSummary::of(&bug));

            let notification = match event.kind {
                StoreEventKind::Added if bug.created_by != observer_email => {
                    Notification::bug_reported(project_id, &bug)
                }
                StoreEventKind::Updated if bug.updated_by != observer_email => {
                    classify_update(project_id, &bug, prior.as_ref())
                }
                // Self-echo: the observer caused this change.
                _ => continue,
            };

            if sender.send(notification).is_err() {
                break;
            }
        }
    })
}

/// Picks the alert message matching what actually changed.
///
/// Priority when a merged snapshot moved several fields at once: a status
/// change outranks a reassignment, which outranks a new attachment. With no
/// prior snapshot the status message is the fallback.
fn classify_update(project_id: ProjectId, bug: &Bug, prior: Option<&BugSummary>) -> Notification {
    match prior {
        Some(prior) if prior.status != bug.status => Notification::bug_updated(project_id, bug),
        Some(prior) if prior.assignee != bug.assignee => {
            Notification::bug_reassigned(project_id, bug)
        }
        Some(prior) if prior.attachments < bug.attachments.len() => {
            Notification::attachment_added(project_id, bug)
        }
        _ => Notification::bug_updated(project_id, bug),
    }
}

/// Live stream of alerts for one signed-in watcher.
pub struct NotificationStream {
    receiver: mpsc::UnboundedReceiver<Notification>,
    tasks: Vec<JoinHandle<()>>,
}

impl NotificationStream {
    /// Receives the next alert, `None` once every watched project is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }

    /// Receives without waiting, `None` when no alert is pending.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Polls for the next alert, for callers bridging into a `Stream`.
    pub fn poll_recv(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Notification>> {
        self.receiver.poll_recv(cx)
    }

    /// Returns how many projects are being watched.
    #[must_use]
    pub fn watched_projects(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{Map, Value, json};
    use tokio::sync::{Mutex, mpsc};
    use tracklet_core::{AppError, AppResult, UserIdentity};
    use tracklet_domain::{Bug, Project, Severity};

    use crate::multiplexer::SubscriptionMultiplexer;
    use crate::store_ports::{RealtimeStore, StoreEvent, StoreEventKind, StoreEvents, StorePath};

    use super::ChangeNotifier;

    struct ScriptedStore {
        documents: HashMap<String, Value>,
        fail_subscribe_for: Option<String>,
        subscriptions: Mutex<Vec<(String, mpsc::UnboundedSender<StoreEvent>)>>,
    }

    impl ScriptedStore {
        fn new(projects: Value) -> Self {
            let mut documents = HashMap::new();
            documents.insert(StorePath::projects().as_str().to_owned(), projects);
            Self {
                documents,
                fail_subscribe_for: None,
                subscriptions: Mutex::new(Vec::new()),
            }
        }

        fn with_document(mut self, path: StorePath, value: Value) -> Self {
            self.documents.insert(path.as_str().to_owned(), value);
            self
        }

        async fn emit(&self, path: StorePath, kind: StoreEventKind, value: Value) {
            let event = StoreEvent { path, kind, value };
            let subscriptions = self.subscriptions.lock().await;
            for (prefix, sender) in subscriptions.iter() {
                if event.path.as_str() == prefix
                    || event.path.as_str().starts_with(&format!("{prefix}/"))
                {
                    let _ = sender.send(event.clone());
                }
            }
        }
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

        async fn read(&self, path: &StorePath) -> AppResult<Option<Value>> {
            Ok(self.documents.get(path.as_str()).cloned())
        }

        async fn subscribe(&self, prefix: &StorePath) -> AppResult<StoreEvents> {
            if let Some(failing) = &self.fail_subscribe_for {
                if prefix.as_str() == failing {
                    return Err(AppError::Store("subscription refused".to_owned()));
                }
            }

            let (sender, receiver) = mpsc::unbounded_channel();
            self.subscriptions
                .lock()
                .await
                .push((prefix.as_str().to_owned(), sender));
            Ok(receiver)
        }
    }

    fn identity(email: &str) -> UserIdentity {
        UserIdentity::new("uid-1", email, "Test User", None, "password")
    }

    fn project_with_members(owner_email: &str, extra: &[&str]) -> Project {
        let mut project = Project::new("Apollo", "", "owner-uid", owner_email, Utc::now())
            .unwrap_or_else(|_| panic!("test"));
        for email in extra {
            project
                .members
                .insert((*email).to_owned(), tracklet_domain::Role::Developer);
        }
        project
    }

    fn projects_document(projects: &[&Project]) -> Value {
        let mut root = Map::new();
        for project in projects {
            root.insert(
                project.id.to_string(),
                serde_json::to_value(project).unwrap_or_default(),
            );
        }
        Value::Object(root)
    }

    fn bugs_document(bugs: &[&Bug]) -> Value {
        let mut root = Map::new();
        for bug in bugs {
            root.insert(
                bug.id.to_string(),
                serde_json::to_value(bug).unwrap_or_default(),
            );
        }
        Value::Object(root)
    }

    fn bug_by(email: &str) -> Bug {
        Bug::new("Login fails", "500 on submit", Severity::High, "", email, Utc::now())
            .unwrap_or_else(|_| panic!("test"))
    }

    #[tokio::test]
    async fn foreign_create_emits_exactly_one_alert() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let store = Arc::new(ScriptedStore::new(projects_document(&[&project])));
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("developer1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(stream.watched_projects(), 1);

        let bug = bug_by("qa1@x.com");
        store
            .emit(
                StorePath::bug(project.id, bug.id),
                StoreEventKind::Added,
                serde_json::to_value(&bug).unwrap_or_default(),
            )
            .await;

        let alert = stream.recv().await;
        assert_eq!(
            alert.map(|alert| alert.message),
            Some("New bug reported: Login fails".to_owned())
        );
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn own_create_is_suppressed() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let store = Arc::new(ScriptedStore::new(projects_document(&[&project])));
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("qa1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let bug = bug_by("qa1@x.com");
        store
            .emit(
                StorePath::bug(project.id, bug.id),
                StoreEventKind::Added,
                serde_json::to_value(&bug).unwrap_or_default(),
            )
            .await;

        tokio::task::yield_now().await;
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn foreign_status_change_names_the_new_status() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let bug = bug_by("qa1@x.com");
        let store = Arc::new(
            ScriptedStore::new(projects_document(&[&project])).with_document(
                StorePath::project_bugs(project.id),
                bugs_document(&[&bug]),
            ),
        );
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("qa1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let mut changed = bug.clone();
        changed.status = tracklet_domain::BugStatus::InProgress;
        changed.updated_by = "developer1@x.com".to_owned();
        store
            .emit(
                StorePath::bug(project.id, changed.id),
                StoreEventKind::Updated,
                serde_json::to_value(&changed).unwrap_or_default(),
            )
            .await;

        let alert = stream.recv().await;
        assert_eq!(
            alert.map(|alert| alert.message),
            Some("Bug status updated: Login fails → in-progress".to_owned())
        );
    }

    #[tokio::test]
    async fn foreign_reassignment_names_the_assignee() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let bug = bug_by("qa1@x.com");
        let store = Arc::new(
            ScriptedStore::new(projects_document(&[&project])).with_document(
                StorePath::project_bugs(project.id),
                bugs_document(&[&bug]),
            ),
        );
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("developer1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let mut changed = bug.clone();
        changed.assignee = "developer1@x.com".to_owned();
        changed.updated_by = "qa1@x.com".to_owned();
        store
            .emit(
                StorePath::bug(project.id, changed.id),
                StoreEventKind::Updated,
                serde_json::to_value(&changed).unwrap_or_default(),
            )
            .await;

        let alert = stream.recv().await;
        assert_eq!(
            alert.map(|alert| alert.message),
            Some("Bug reassigned: Login fails → developer1@x.com".to_owned())
        );
    }

    #[tokio::test]
    async fn foreign_attachment_stamp_names_the_attachment() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let bug = bug_by("qa1@x.com");
        let store = Arc::new(
            ScriptedStore::new(projects_document(&[&project])).with_document(
                StorePath::project_bugs(project.id),
                bugs_document(&[&bug]),
            ),
        );
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("developer1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        // Same status and assignee; only the attachments list grew.
        let mut changed = bug.clone();
        changed.attachments.push("memory://uploads/evidence.png".to_owned());
        changed.updated_by = "qa1@x.com".to_owned();
        store
            .emit(
                StorePath::bug(project.id, changed.id),
                StoreEventKind::Updated,
                serde_json::to_value(&changed).unwrap_or_default(),
            )
            .await;

        let alert = stream.recv().await;
        assert_eq!(
            alert.map(|alert| alert.message),
            Some("New attachment on bug: Login fails".to_owned())
        );
    }

    #[tokio::test]
    async fn own_update_is_suppressed() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let store = Arc::new(ScriptedStore::new(projects_document(&[&project])));
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("developer1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let mut bug = bug_by("qa1@x.com");
        bug.updated_by = "developer1@x.com".to_owned();
        store
            .emit(
                StorePath::bug(project.id, bug.id),
                StoreEventKind::Updated,
                serde_json::to_value(&bug).unwrap_or_default(),
            )
            .await;

        tokio::task::yield_now().await;
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn non_member_projects_are_not_watched() {
        let mine = project_with_members("me@x.com", &[]);
        let theirs = project_with_members("someone-else@x.com", &[]);
        let store = Arc::new(ScriptedStore::new(projects_document(&[&mine, &theirs])));
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let stream = notifier
            .watch(&identity("me@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(stream.watched_projects(), 1);
    }

    #[tokio::test]
    async fn one_failing_project_does_not_abort_the_others() {
        let first = project_with_members("me@x.com", &[]);
        let second = project_with_members("me@x.com", &[]);
        let mut store = ScriptedStore::new(projects_document(&[&first, &second]));
        store.fail_subscribe_for = Some(StorePath::project_bugs(first.id).as_str().to_owned());

        let store = Arc::new(store);
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let stream = notifier
            .watch(&identity("me@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(stream.watched_projects(), 1);
    }

    #[tokio::test]
    async fn attachment_subdocument_events_are_ignored() {
        let project = project_with_members("qa1@x.com", &["developer1@x.com"]);
        let store = Arc::new(ScriptedStore::new(projects_document(&[&project])));
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), multiplexer);

        let mut stream = notifier
            .watch(&identity("developer1@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let bug = bug_by("qa1@x.com");
        store
            .emit(
                StorePath::bug_attachments(project.id, bug.id),
                StoreEventKind::Updated,
                json!(["memory://uploads/evidence.png"]),
            )
            .await;

        tokio::task::yield_now().await;
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn dropping_the_stream_releases_every_subscription() {
        let project = project_with_members("me@x.com", &[]);
        let store = Arc::new(ScriptedStore::new(projects_document(&[&project])));
        let multiplexer = Arc::new(SubscriptionMultiplexer::new(store.clone()));
        let notifier = ChangeNotifier::new(store.clone(), Arc::clone(&multiplexer));

        let stream = notifier
            .watch(&identity("me@x.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(multiplexer.active_topics(), 1);

        drop(stream);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(multiplexer.active_topics(), 0);
    }
}
