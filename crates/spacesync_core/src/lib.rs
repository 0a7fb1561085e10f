//! Dual-view spatial synchronization engine.
//!
//! Keeps a 2D canvas and a 3D scene of the same shared space consistent with
//! each other and with a property store mutated concurrently by peers.

pub mod binding;
pub mod canvas;
pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod projection;
pub mod registry;
pub mod scene;
pub mod service;
pub mod spatial;
pub mod store;

pub use binding::{BindingState, ScopedBinding};
pub use canvas::{CanvasEditor, CanvasSync};
pub use config::{ConfigError, SyncConfig};
pub use events::{EventBus, InteractionEvent, Subscription, Topic};
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status};
pub use model::movable::{Movable, MovableKind, MovablePayload};
pub use model::space::{Boundary, ClippingMode, Space};
pub use model::value::{EntityId, PropertyMap, PropertyValue};
pub use projection::{
    canvas_to_world, project_to_canvas, ProjectionPlane, ProjectionPreset, CANVAS_UNITS_PER_METER,
};
pub use registry::{ManagerRegistry, SPACE_MANAGER_TYPE};
pub use scene::{RendererRegistry, SceneGraph, SceneSync};
pub use service::space_service::{
    CreateSpaceRequest, SpaceService, SpaceServiceError, SpawnMovableRequest,
};
pub use spatial::{is_visible, move_entity_to_space, TransferError, DEFAULT_TRASH_DISTANCE};
pub use store::{EntityHandle, EntityStore, SqliteEntityStore, StoreError, StoreResult};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
