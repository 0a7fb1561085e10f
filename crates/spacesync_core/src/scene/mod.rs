//! Scene sync layer: the 3D view of one space.
//!
//! # Responsibility
//! - Render exactly one node per member entity, keyed by entity id.
//! - Keep node transforms and clipping in line with store state.
//! - Run world-space trashcan watchers for rendered trashcans.
//!
//! # Invariants
//! - Reordering the member list never remounts a node.
//! - A node exists only while its entity's binding is bound.
//! - `unmount` releases every binding and subscription synchronously.

mod graph;
mod renderers;
mod sync;

pub use graph::{NodeId, NodeSpec, SceneGraph, Transform};
pub use renderers::{RendererFactory, RendererRegistry};
pub use sync::SceneSync;
