//! Contract of the 2D editor collaborator.

use crate::model::movable::MovableKind;
use crate::model::value::EntityId;
use glam::DVec2;

pub type ShapeId = String;

const MOVABLE_SHAPE_PREFIX: &str = "shape:";
const TITLE_SHAPE_PREFIX: &str = "title:";

/// Shape id of the canvas shape drawing `entity_id`.
pub fn shape_id_for(entity_id: &str) -> ShapeId {
    format!("{MOVABLE_SHAPE_PREFIX}{entity_id}")
}

/// Entity drawn by a movable shape; `None` for any other shape.
pub fn entity_id_for_shape(shape_id: &str) -> Option<&str> {
    shape_id
        .strip_prefix(MOVABLE_SHAPE_PREFIX)
        .filter(|id| !id.is_empty())
}

pub fn title_shape_id(space_id: &str) -> ShapeId {
    format!("{TITLE_SHAPE_PREFIX}{space_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Movable(MovableKind),
    Title,
}

/// Full description of one shape. `position` is the shape centre.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub position: DVec2,
    pub size: DVec2,
    pub text: Option<String>,
    pub locked: bool,
    /// Drawn de-emphasized, outside the space boundary.
    pub clipped: bool,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeUpdate {
    pub position: Option<DVec2>,
    pub size: Option<DVec2>,
    pub text: Option<String>,
    pub locked: Option<bool>,
    pub clipped: Option<bool>,
}

impl ShapeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields of `target` that differ from `current`.
    pub fn diff(current: &ShapeSpec, target: &ShapeSpec) -> Self {
        Self {
            position: (current.position != target.position).then_some(target.position),
            size: (current.size != target.size).then_some(target.size),
            text: (current.text != target.text)
                .then(|| target.text.clone())
                .flatten(),
            locked: (current.locked != target.locked).then_some(target.locked),
            clipped: (current.clipped != target.clipped).then_some(target.clipped),
        }
    }
}

/// Live editor state and shape operations.
///
/// Implementations use interior mutability; every call happens on the
/// single UI thread. Operations on unknown shape ids are ignored.
pub trait CanvasEditor {
    fn selected_shape_ids(&self) -> Vec<ShapeId>;
    fn hovered_shape_id(&self) -> Option<ShapeId>;
    /// Whether a pointer drag is in progress.
    fn is_dragging(&self) -> bool;
    fn shape(&self, id: &str) -> Option<ShapeSpec>;
    fn create_shape(&self, spec: ShapeSpec);
    fn update_shape(&self, id: &str, update: ShapeUpdate);
    /// Locked shapes cannot be deleted; unlock them first.
    fn delete_shape(&self, id: &str);
}

/// Entities behind the editor's selected movable shapes, in selection order.
pub fn selected_entities(editor: &dyn CanvasEditor) -> Vec<EntityId> {
    editor
        .selected_shape_ids()
        .iter()
        .filter_map(|shape_id| entity_id_for_shape(shape_id))
        .map(str::to_string)
        .collect()
}

pub fn hovered_entity(editor: &dyn CanvasEditor) -> Option<EntityId> {
    editor
        .hovered_shape_id()
        .as_deref()
        .and_then(entity_id_for_shape)
        .map(str::to_string)
}
