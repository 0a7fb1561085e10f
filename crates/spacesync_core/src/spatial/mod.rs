//! Spatial policy: boundary clipping, space transfer, proximity deletion.
//!
//! # Responsibility
//! - Decide whether an entity renders normally or clipped.
//! - Move entities between spaces and re-derive membership indexes.
//! - Delete entities dropped close enough to a trashcan.
//!
//! # Invariants
//! - Missing or malformed spatial data means "outside", never an error.
//! - An entity's `space` field is authoritative; a space's `movables` list
//!   is a derived index that may transiently disagree with it.
//! - Deleting an entity that is already gone is a silent no-op.

pub mod clipping;
pub mod transfer;
pub mod trashcan;

pub use clipping::{is_movable_visible, is_visible};
pub use transfer::{
    move_entity_to_space, rebuild_membership, remove_movable, TransferError, TransferOutcome,
};
pub use trashcan::{
    evaluate_drop, DropVerdict, ProximityMetric, TrashcanWatcher, DEFAULT_TRASH_DISTANCE,
};
