//! Space model.
//!
//! # Invariants
//! - A boundary is an axis-aligned closed box `origin ± size / 2`.
//! - A boundary with a negative or non-finite component is not a boundary.

use crate::model::value::EntityId;
use crate::projection::{ProjectionPlane, ProjectionPreset};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Store type tag for spaces.
pub const SPACE_TYPE: &str = "Space";

/// Stored property names of a space and its manager.
pub mod props {
    pub const NAME: &str = "name";
    pub const MOVABLES: &str = "movables";
    pub const BOUNDARY_ORIGIN: &str = "boundaryOrigin";
    pub const BOUNDARY_SIZE: &str = "boundarySize";
    pub const PROJECTION: &str = "projection";
    pub const SHOW_BOUNDARY: &str = "showBoundary";
    pub const CLIPPING_MODE: &str = "clippingMode";
    pub const CURRENT_SPACE: &str = "currentSpace";
}

/// How a space treats entities outside its boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClippingMode {
    /// Entities outside the boundary render clipped.
    #[default]
    Clip,
    /// Every entity renders normally.
    ShowAll,
}

impl ClippingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clip => "clip",
            Self::ShowAll => "show_all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "clip" => Some(Self::Clip),
            "show_all" | "show-all" => Some(Self::ShowAll),
            _ => None,
        }
    }
}

/// Axis-aligned boundary box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub origin: DVec3,
    pub size: DVec3,
}

impl Boundary {
    /// Returns a boundary only for finite data with non-negative size.
    pub fn new(origin: DVec3, size: DVec3) -> Option<Self> {
        if !origin.is_finite() || !size.is_finite() || size.min_element() < 0.0 {
            return None;
        }
        Some(Self { origin, size })
    }

    pub fn min(&self) -> DVec3 {
        self.origin - self.size / 2.0
    }

    pub fn max(&self) -> DVec3 {
        self.origin + self.size / 2.0
    }

    /// Closed containment test on every axis.
    pub fn contains(&self, point: DVec3) -> bool {
        if !point.is_finite() {
            return false;
        }
        let (min, max) = (self.min(), self.max());
        point.cmpge(min).all() && point.cmple(max).all()
    }
}

/// Snapshot of one space read from the store in a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub id: EntityId,
    pub name: String,
    /// Derived membership index, deduplicated, stored order kept.
    pub movables: Vec<EntityId>,
    pub boundary: Option<Boundary>,
    pub projection: ProjectionPreset,
    pub show_boundary: bool,
    /// `None` when the space stores no (or an unknown) mode.
    pub clipping: Option<ClippingMode>,
}

impl Space {
    /// Projection plane through the boundary origin (world origin if none).
    pub fn plane(&self) -> ProjectionPlane {
        let origin = self
            .boundary
            .map(|boundary| boundary.origin)
            .unwrap_or(DVec3::ZERO);
        ProjectionPlane::from_preset(self.projection, origin)
    }

    pub fn clipping_or(&self, fallback: ClippingMode) -> ClippingMode {
        self.clipping.unwrap_or(fallback)
    }
}
