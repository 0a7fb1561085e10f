//! FFI use-case API for host-facing calls.
//!
//! # Responsibility
//! - Expose projection, clipping and logging entry points through FRB.
//! - Keep argument shapes primitive (strings, `Vec<f64>`, bools).
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Malformed vectors fail soft: empty vectors or `false`, never errors.

use glam::{DVec2, DVec3};
use log::debug;
use spacesync_core::projection::{
    canvas_to_world as canvas_to_world_inner, project_to_canvas as project_to_canvas_inner,
};
use spacesync_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, is_visible,
    ping as ping_inner, Boundary, ClippingMode, ProjectionPlane, ProjectionPreset,
    CANVAS_UNITS_PER_METER,
};

/// Health check.
///
/// # FFI contract
/// - Sync call, non-blocking; never throws.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling log files.
///
/// # FFI contract
/// - Repeating the same `level + log_dir` is idempotent.
/// - Returns an empty string on success, the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Canvas units per world meter.
#[flutter_rust_bridge::frb(sync)]
pub fn canvas_units_per_meter() -> f64 {
    CANVAS_UNITS_PER_METER
}

/// Projects `world` (`[x, y, z]`) onto the canvas of a space whose plane
/// uses `preset` (`top_down|front|side`) through `origin`.
///
/// Returns `[x, y]`, or an empty vector for malformed input.
#[flutter_rust_bridge::frb(sync)]
pub fn project_to_canvas(preset: String, origin: Vec<f64>, world: Vec<f64>) -> Vec<f64> {
    let (Some(plane), Some(world)) = (plane_from(&preset, &origin), vec3_from(&world)) else {
        return Vec::new();
    };
    let canvas = project_to_canvas_inner(world, &plane);
    vec![canvas.x, canvas.y]
}

/// Inverse of `project_to_canvas`; returns `[x, y, z]` or an empty vector.
#[flutter_rust_bridge::frb(sync)]
pub fn canvas_to_world(preset: String, origin: Vec<f64>, x: f64, y: f64) -> Vec<f64> {
    let Some(plane) = plane_from(&preset, &origin) else {
        return Vec::new();
    };
    let canvas = DVec2::new(x, y);
    if !canvas.is_finite() {
        return Vec::new();
    }
    canvas_to_world_inner(canvas, &plane).to_array().to_vec()
}

/// Clipping predicate for renderers.
///
/// `mode` is `clip` or `show_all`; anything else is treated as `clip`.
/// Malformed boundary or position vectors count as outside.
#[flutter_rust_bridge::frb(sync)]
pub fn is_entity_visible(
    mode: String,
    boundary_origin: Vec<f64>,
    boundary_size: Vec<f64>,
    position: Vec<f64>,
    being_dragged: bool,
) -> bool {
    let mode = ClippingMode::parse(&mode).unwrap_or_default();
    let boundary = vec3_from(&boundary_origin)
        .zip(vec3_from(&boundary_size))
        .and_then(|(origin, size)| Boundary::new(origin, size));
    is_visible(mode, boundary.as_ref(), vec3_from(&position), being_dragged)
}

fn plane_from(preset: &str, origin: &[f64]) -> Option<ProjectionPlane> {
    let Some(preset) = ProjectionPreset::parse(preset) else {
        debug!(
            "event=ffi_projection module=ffi status=skip reason=unknown_preset preset={}",
            preset
        );
        return None;
    };
    let (axis_u, axis_v) = preset.axes();
    match ProjectionPlane::new(vec3_raw(origin)?, axis_u, axis_v) {
        Ok(plane) => Some(plane),
        Err(err) => {
            debug!(
                "event=ffi_projection module=ffi status=skip reason=invalid_plane error={}",
                err
            );
            None
        }
    }
}

fn vec3_raw(values: &[f64]) -> Option<DVec3> {
    match values {
        [x, y, z] => Some(DVec3::new(*x, *y, *z)),
        _ => None,
    }
}

fn vec3_from(values: &[f64]) -> Option<DVec3> {
    vec3_raw(values).filter(|vector| vector.is_finite())
}
