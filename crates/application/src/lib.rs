//! Application services and ports.

#![forbid(unsafe_code)]

mod blob_ports;
mod identity_ports;
mod lifecycle_service;
mod multiplexer;
mod notifier;
mod retry;
mod store_ports;

pub use blob_ports::BlobStore;
pub use identity_ports::{IdentityProvider, SignedInUser};
pub use lifecycle_service::{
    AttachFileInput, CreateBugInput, CreateProjectInput, LifecycleService,
};
pub use multiplexer::{SubscriptionHandle, SubscriptionMultiplexer};
pub use notifier::{ChangeNotifier, NotificationStream};
pub use retry::with_backoff;
pub use store_ports::{RealtimeStore, StoreEvent, StoreEventKind, StoreEvents, StorePath};
