//! Contract of the 3D scene-graph collaborator.

use glam::DVec3;

pub type NodeId = u64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: DVec3,
    /// Euler angles, radians.
    pub rotation: DVec3,
}

/// What to instantiate for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// Scene template name, e.g. `note` or `model`.
    pub template: &'static str,
    pub label: Option<String>,
    pub source: Option<String>,
}

/// Scene-graph node operations. Calls for unknown nodes are ignored.
pub trait SceneGraph {
    fn spawn(&self, spec: NodeSpec, transform: Transform, clipped: bool) -> NodeId;
    fn update(&self, node: NodeId, transform: Transform, clipped: bool);
    fn despawn(&self, node: NodeId);
}
