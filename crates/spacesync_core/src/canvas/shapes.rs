use crate::canvas::editor::{shape_id_for, CanvasEditor, ShapeKind, ShapeSpec, ShapeUpdate};
use crate::model::movable::{props, Movable, MovablePayload};
use crate::model::space::{ClippingMode, Space};
use crate::model::value::EntityId;
use crate::projection::{canvas_size_for, canvas_to_world, project_to_canvas};
use crate::spatial::is_movable_visible;
use crate::store::access;
use crate::store::EntityStore;
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Positions closer than this (world units) are not written back.
const WRITE_BACK_EPSILON: f64 = 1e-9;

/// Keeps one canvas shape per rendered member of a space.
#[derive(Debug, Default)]
pub struct ShapeProjector {
    drawn: RefCell<BTreeSet<EntityId>>,
}

impl ShapeProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawn(&self) -> Vec<EntityId> {
        self.drawn.borrow().iter().cloned().collect()
    }

    /// Loads the members of `space` that still reference it and carry a
    /// position, in member-list order.
    pub async fn load_members(store: &dyn EntityStore, space: &Space) -> Vec<Movable> {
        let mut members = Vec::with_capacity(space.movables.len());
        for id in &space.movables {
            let Some(movable) = access::load_movable(store, id).await else {
                continue;
            };
            if !movable.belongs_to(&space.id) {
                debug!(
                    "event=shape_project module=canvas status=skip reason=stale_member space={} entity={}",
                    space.id, id
                );
                continue;
            }
            if movable.position.is_some() {
                members.push(movable);
            }
        }
        members
    }

    /// Creates, updates and deletes shapes so the canvas shows `members`.
    ///
    /// Shapes in `dragging` keep their editor position; the drag owns them.
    pub fn project(
        &self,
        editor: &dyn CanvasEditor,
        space: &Space,
        members: &[Movable],
        fallback: ClippingMode,
        dragging: &[EntityId],
    ) {
        let plane = space.plane();
        let mut next = BTreeSet::new();
        for movable in members {
            let Some(position) = movable.position else {
                continue;
            };
            let shape_id = shape_id_for(&movable.id);
            let spec = ShapeSpec {
                id: shape_id.clone(),
                kind: ShapeKind::Movable(movable.kind()),
                position: project_to_canvas(position, &plane),
                size: canvas_size_for(movable.kind().footprint()),
                text: match &movable.payload {
                    MovablePayload::Note { text } => Some(text.clone()),
                    _ => None,
                },
                locked: false,
                clipped: !is_movable_visible(space, movable, fallback),
            };

            match editor.shape(&shape_id) {
                Some(current) => {
                    let mut update = ShapeUpdate::diff(&current, &spec);
                    update.locked = None;
                    if dragging.contains(&movable.id) {
                        update.position = None;
                    }
                    if !update.is_empty() {
                        editor.update_shape(&shape_id, update);
                    }
                }
                None => editor.create_shape(spec),
            }
            next.insert(movable.id.clone());
        }

        let departed: Vec<EntityId> = self.drawn.borrow().difference(&next).cloned().collect();
        for id in &departed {
            editor.delete_shape(&shape_id_for(id));
        }
        *self.drawn.borrow_mut() = next;
    }

    /// Writes the canvas positions of `ids` back to their `position`,
    /// keeping each entity's offset from the projection plane.
    ///
    /// `live` is checked before every write; once it returns `false` the
    /// remaining ids are skipped. Returns how many positions were written.
    pub async fn write_back(
        &self,
        store: &dyn EntityStore,
        editor: &dyn CanvasEditor,
        space: &Space,
        ids: &[EntityId],
        live: &dyn Fn() -> bool,
    ) -> usize {
        let plane = space.plane();
        let mut written = 0;
        for id in ids {
            if !self.drawn.borrow().contains(id) {
                continue;
            }
            let Some(shape) = editor.shape(&shape_id_for(id)) else {
                continue;
            };
            let Some(handle) = access::resolve(store, id).await else {
                continue;
            };
            let Some(current) = access::read_vec3(store, &handle, props::POSITION).await else {
                continue;
            };
            let target =
                canvas_to_world(shape.position, &plane) + plane.normal() * plane.offset_of(current);
            if target.distance(current) <= WRITE_BACK_EPSILON {
                continue;
            }
            if !live() {
                break;
            }
            if access::write(store, &handle, props::POSITION, target.into()).await {
                written += 1;
            }
        }
        written
    }

    /// Deletes every drawn shape.
    pub fn clear(&self, editor: &dyn CanvasEditor) {
        let drawn = std::mem::take(&mut *self.drawn.borrow_mut());
        for id in &drawn {
            editor.delete_shape(&shape_id_for(id));
        }
    }
}
