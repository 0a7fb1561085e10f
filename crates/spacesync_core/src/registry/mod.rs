//! Process-wide registries of singleton managers.
//!
//! # Responsibility
//! - Keep exactly one manager entity per registered singleton type.
//! - Re-run the idempotent ensure routine at startup and after reloads.
//!
//! # Invariants
//! - `ensure_exists` converges to one instance: when concurrent creators
//!   raced, the earliest-created entity is kept and the rest deleted.

mod manager;

pub use manager::{ManagerRegistry, SPACE_MANAGER_TYPE};
