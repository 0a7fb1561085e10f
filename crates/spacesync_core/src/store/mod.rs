//! Entity store adapter.
//!
//! # Responsibility
//! - Define the async contract every shared property store must satisfy.
//! - Provide fail-soft typed accessors used by rendering/interaction code.
//! - Ship a SQLite-backed reference store for local use and tests.
//!
//! # Invariants
//! - The store owns every entity; callers hold handles, never copies.
//! - Lookups of missing entities return `None`, never an error.
//! - Array-valued properties are replaced wholesale on write.

pub mod access;
mod adapter;
mod filter;
mod listeners;
mod schema;
mod sqlite_store;

pub use adapter::{
    ChangeListener, EntityHandle, EntityStore, ListenerId, ReloadListener, StoreChange,
    StoreError, StoreResult,
};
pub use filter::PropertyFilter;
pub use listeners::ListenerRegistry;
pub use schema::{SchemaError, SchemaRegistry, TypeSchema, MOVABLE_CAPABILITY};
pub use sqlite_store::SqliteEntityStore;
