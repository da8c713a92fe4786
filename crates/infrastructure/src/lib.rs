//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_blob_store;
mod in_memory_identity_provider;
mod in_memory_realtime_store;

pub use in_memory_blob_store::InMemoryBlobStore;
pub use in_memory_identity_provider::InMemoryIdentityProvider;
pub use in_memory_realtime_store::InMemoryRealtimeStore;
