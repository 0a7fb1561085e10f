//! Movable entity model.
//!
//! # Responsibility
//! - Name the registered movable kinds and their stored properties.
//! - Provide the per-tick `Movable` snapshot consumed by both views.
//!
//! # Invariants
//! - `selected` and `being_dragged` are independent flags.
//! - An entity references at most one space.

use crate::model::value::EntityId;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Stored property names shared by every movable kind.
pub mod props {
    pub const POSITION: &str = "position";
    pub const ROTATION: &str = "rotation";
    pub const SELECTED: &str = "selected";
    pub const HOVERED: &str = "hovered";
    pub const BEING_DRAGGED: &str = "beingDragged";
    pub const SPACE: &str = "space";
    pub const TEXT: &str = "text";
    pub const URL: &str = "url";
    pub const CLIENT_ID: &str = "clientId";
}

/// Registered movable kinds.
///
/// The string form doubles as the store type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovableKind {
    Note,
    Image,
    Model,
    Trashcan,
    ScreenShare,
}

impl MovableKind {
    pub const ALL: [MovableKind; 5] = [
        Self::Note,
        Self::Image,
        Self::Model,
        Self::Trashcan,
        Self::ScreenShare,
    ];

    /// Store type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Image => "Image",
            Self::Model => "Model",
            Self::Trashcan => "Trashcan",
            Self::ScreenShare => "ScreenShare",
        }
    }

    pub fn parse(type_tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == type_tag)
    }

    /// In-plane world footprint (meters) used to size 2D shapes.
    pub fn footprint(self) -> DVec2 {
        match self {
            Self::Note => DVec2::new(0.2, 0.2),
            Self::Image => DVec2::new(0.4, 0.3),
            Self::Model => DVec2::new(0.3, 0.3),
            Self::Trashcan => DVec2::new(0.25, 0.25),
            Self::ScreenShare => DVec2::new(0.8, 0.45),
        }
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovablePayload {
    Note { text: String },
    Image { url: String },
    Model { url: String },
    Trashcan,
    ScreenShare { client_id: Option<String> },
}

impl MovablePayload {
    pub fn kind(&self) -> MovableKind {
        match self {
            Self::Note { .. } => MovableKind::Note,
            Self::Image { .. } => MovableKind::Image,
            Self::Model { .. } => MovableKind::Model,
            Self::Trashcan => MovableKind::Trashcan,
            Self::ScreenShare { .. } => MovableKind::ScreenShare,
        }
    }
}

/// Snapshot of one movable read from the store in a single tick.
///
/// `position`/`rotation` are `None` when the stored value is missing or
/// malformed; spatial policy treats such entities as outside every boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Movable {
    pub id: EntityId,
    pub payload: MovablePayload,
    pub position: Option<DVec3>,
    pub rotation: Option<DVec3>,
    pub selected: bool,
    pub hovered: bool,
    pub being_dragged: bool,
    pub space: Option<EntityId>,
}

impl Movable {
    pub fn kind(&self) -> MovableKind {
        self.payload.kind()
    }

    pub fn belongs_to(&self, space_id: &str) -> bool {
        self.space.as_deref() == Some(space_id)
    }
}
