use crate::model::movable::Movable;
use crate::model::space::{Boundary, ClippingMode, Space};
use glam::DVec3;

/// Whether an entity renders unclipped.
///
/// True when `mode` is `ShowAll`, when the entity is being dragged, or when
/// a valid `position` lies inside a valid `boundary`.
pub fn is_visible(
    mode: ClippingMode,
    boundary: Option<&Boundary>,
    position: Option<DVec3>,
    being_dragged: bool,
) -> bool {
    if mode == ClippingMode::ShowAll || being_dragged {
        return true;
    }
    match (boundary, position) {
        (Some(boundary), Some(position)) => boundary.contains(position),
        _ => false,
    }
}

/// `is_visible` for store snapshots; `fallback` applies when the space has
/// no stored clipping mode.
pub fn is_movable_visible(space: &Space, movable: &Movable, fallback: ClippingMode) -> bool {
    is_visible(
        space.clipping_or(fallback),
        space.boundary.as_ref(),
        movable.position,
        movable.being_dragged,
    )
}
