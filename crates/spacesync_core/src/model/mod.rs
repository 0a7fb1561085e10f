//! Domain model for movables, spaces and their stored property values.
//!
//! # Responsibility
//! - Define the typed read models projected from store property bags.
//! - Keep property names in one place so both views agree on them.
//!
//! # Invariants
//! - The shared store owns every value; these types are per-tick snapshots.
//! - An entity's `space` field is authoritative; a space's `movables` list
//!   is a derived index that may lag behind it.

pub mod movable;
pub mod space;
pub mod value;
