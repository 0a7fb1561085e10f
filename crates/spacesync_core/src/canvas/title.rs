use crate::canvas::editor::{title_shape_id, CanvasEditor, ShapeId, ShapeKind, ShapeSpec, ShapeUpdate};
use crate::model::space::Space;
use crate::projection::canvas_size_for;
use glam::DVec2;
use log::debug;
use std::cell::Cell;

const TITLE_HEIGHT: f64 = 32.0;
const TITLE_MIN_WIDTH: f64 = 200.0;

/// Locked text shape showing the space name above its boundary.
pub struct TitleLabel {
    shape_id: ShapeId,
    offset: f64,
    mounted: Cell<bool>,
}

impl TitleLabel {
    pub fn new(space_id: &str, offset: f64) -> Self {
        Self {
            shape_id: title_shape_id(space_id),
            offset,
            mounted: Cell::new(false),
        }
    }

    pub fn shape_id(&self) -> &str {
        &self.shape_id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Creates the label, or refreshes it when it already exists.
    pub fn mount(&self, editor: &dyn CanvasEditor, space: &Space) {
        let spec = self.spec_for(space);
        match editor.shape(&self.shape_id) {
            Some(current) => {
                let update = ShapeUpdate::diff(&current, &spec);
                if !update.is_empty() {
                    editor.update_shape(&self.shape_id, update);
                }
            }
            None => editor.create_shape(spec),
        }
        self.mounted.set(true);
        debug!(
            "event=title_mount module=canvas status=ok space={}",
            space.id
        );
    }

    /// Keeps text and placement in line with the space.
    pub fn sync(&self, editor: &dyn CanvasEditor, space: &Space) {
        if !self.mounted.get() {
            return;
        }
        let spec = self.spec_for(space);
        let Some(current) = editor.shape(&self.shape_id) else {
            editor.create_shape(spec);
            return;
        };
        let update = ShapeUpdate::diff(&current, &spec);
        if !update.is_empty() {
            editor.update_shape(&self.shape_id, update);
        }
    }

    /// Releases the lock, then deletes the label.
    pub fn unmount(&self, editor: &dyn CanvasEditor) {
        if !self.mounted.replace(false) {
            return;
        }
        editor.update_shape(
            &self.shape_id,
            ShapeUpdate {
                locked: Some(false),
                ..ShapeUpdate::default()
            },
        );
        editor.delete_shape(&self.shape_id);
    }

    fn spec_for(&self, space: &Space) -> ShapeSpec {
        let plane = space.plane();
        let half_extent = space
            .boundary
            .map(|boundary| {
                let in_plane = DVec2::new(
                    boundary.size.dot(plane.axis_u()).abs(),
                    boundary.size.dot(plane.axis_v()).abs(),
                );
                canvas_size_for(in_plane) / 2.0
            })
            .unwrap_or(DVec2::ZERO);
        ShapeSpec {
            id: self.shape_id.clone(),
            kind: ShapeKind::Title,
            position: DVec2::new(0.0, -half_extent.y - self.offset),
            size: DVec2::new((half_extent.x * 2.0).max(TITLE_MIN_WIDTH), TITLE_HEIGHT),
            text: Some(space.name.clone()),
            locked: true,
            clipped: false,
        }
    }
}
