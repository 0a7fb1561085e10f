//! Projection between world space and a space's 2D canvas.
//!
//! # Responsibility
//! - Map world positions onto a space's projection plane and back.
//! - Derive canvas sizes from world sizes through one scale constant.
//!
//! # Invariants
//! - Every function here is pure; callers may invoke them per frame.
//! - `canvas_to_world(project_to_canvas(p))` returns `p` for points on the
//!   plane, within floating-point tolerance.

mod plane;

pub use plane::{
    canvas_distance, canvas_size_for, canvas_to_world, project_to_canvas,
    ProjectionError, ProjectionPlane, ProjectionPreset, CANVAS_UNITS_PER_METER,
};
