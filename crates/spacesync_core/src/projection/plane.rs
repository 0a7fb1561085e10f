use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Canvas units per world meter. Every canvas size derives from this.
pub const CANVAS_UNITS_PER_METER: f64 = 400.0;

const AXIS_TOLERANCE: f64 = 1e-9;

/// Named plane orientations a space can store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionPreset {
    /// Looking down the Y axis: canvas x = world x, canvas y = world z.
    #[default]
    TopDown,
    /// Looking down the Z axis: canvas y grows as world y falls.
    Front,
    /// Looking down the X axis.
    Side,
}

impl ProjectionPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopDown => "top_down",
            Self::Front => "front",
            Self::Side => "side",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "top_down" | "top-down" => Some(Self::TopDown),
            "front" => Some(Self::Front),
            "side" => Some(Self::Side),
            _ => None,
        }
    }

    /// In-plane `(u, v)` axes of this preset.
    pub fn axes(self) -> (DVec3, DVec3) {
        match self {
            Self::TopDown => (DVec3::X, DVec3::Z),
            Self::Front => (DVec3::X, DVec3::NEG_Y),
            Self::Side => (DVec3::Z, DVec3::NEG_Y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    NonFinite,
    AxesNotOrthonormal,
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite => write!(f, "projection plane has non-finite components"),
            Self::AxesNotOrthonormal => {
                write!(f, "projection plane axes must be unit length and orthogonal")
            }
        }
    }
}

impl Error for ProjectionError {}

/// Plane a space's canvas is drawn on: an origin plus two in-plane axes.
///
/// The canvas origin maps to `origin`; canvas x runs along `axis_u` and
/// canvas y along `axis_v`, both scaled by `CANVAS_UNITS_PER_METER`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionPlane {
    origin: DVec3,
    axis_u: DVec3,
    axis_v: DVec3,
}

impl ProjectionPlane {
    /// Builds a plane from explicit axes.
    ///
    /// # Errors
    /// - `NonFinite` when any component is NaN or infinite.
    /// - `AxesNotOrthonormal` when the axes are not unit length and
    ///   perpendicular; the round-trip law only holds for such axes.
    pub fn new(origin: DVec3, axis_u: DVec3, axis_v: DVec3) -> Result<Self, ProjectionError> {
        if !origin.is_finite() || !axis_u.is_finite() || !axis_v.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        let unit_u = (axis_u.length() - 1.0).abs() <= AXIS_TOLERANCE;
        let unit_v = (axis_v.length() - 1.0).abs() <= AXIS_TOLERANCE;
        if !unit_u || !unit_v || axis_u.dot(axis_v).abs() > AXIS_TOLERANCE {
            return Err(ProjectionError::AxesNotOrthonormal);
        }
        Ok(Self {
            origin,
            axis_u,
            axis_v,
        })
    }

    pub fn from_preset(preset: ProjectionPreset, origin: DVec3) -> Self {
        let (axis_u, axis_v) = preset.axes();
        Self {
            origin,
            axis_u,
            axis_v,
        }
    }

    pub fn top_down(origin: DVec3) -> Self {
        Self::from_preset(ProjectionPreset::TopDown, origin)
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn axis_u(&self) -> DVec3 {
        self.axis_u
    }

    pub fn axis_v(&self) -> DVec3 {
        self.axis_v
    }

    pub fn normal(&self) -> DVec3 {
        self.axis_u.cross(self.axis_v)
    }

    /// Signed distance of `world` from the plane along its normal.
    pub fn offset_of(&self, world: DVec3) -> f64 {
        (world - self.origin).dot(self.normal())
    }
}

/// Projects a world position onto the plane's canvas.
pub fn project_to_canvas(world: DVec3, plane: &ProjectionPlane) -> DVec2 {
    let relative = world - plane.origin;
    DVec2::new(relative.dot(plane.axis_u), relative.dot(plane.axis_v)) * CANVAS_UNITS_PER_METER
}

/// Maps a canvas position back to the world point on the plane.
pub fn canvas_to_world(canvas: DVec2, plane: &ProjectionPlane) -> DVec3 {
    let meters = canvas / CANVAS_UNITS_PER_METER;
    plane.origin + plane.axis_u * meters.x + plane.axis_v * meters.y
}

/// Canvas size for an in-plane world size.
pub fn canvas_size_for(world_size: DVec2) -> DVec2 {
    world_size * CANVAS_UNITS_PER_METER
}

/// Planar distance in canvas units between two projected world points.
pub fn canvas_distance(a: DVec3, b: DVec3, plane: &ProjectionPlane) -> f64 {
    project_to_canvas(a, plane).distance(project_to_canvas(b, plane))
}
