//! Per-view scoped bindings to one entity identity.
//!
//! # Responsibility
//! - Resolve a view node's target identifier into a live store handle.
//! - Gate property reads/writes and change delivery on that identity.
//!
//! # Invariants
//! - A binding is swapped only when its identifier changes, never on
//!   property updates of the same identifier.
//! - Every identity change or teardown releases store subscriptions before
//!   any new resolution begins.
//! - Results and writes issued for a detached identity are discarded.
//!
//! # See also
//! - `scene::SceneSync`, which owns one binding per rendered entity.

mod scoped;

pub use scoped::{BindingListener, BindingState, BindingTicket, ScopedBinding};
