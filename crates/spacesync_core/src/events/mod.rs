//! In-process interaction events.
//!
//! # Responsibility
//! - Broadcast drag and selection signals between unrelated view components.
//!
//! # Invariants
//! - Delivery is synchronous, in registration order, at most once per
//!   publish, without queuing or replay.
//! - A panicking subscriber does not stop delivery to the others.

mod bus;

pub use bus::{EventBus, InteractionEvent, Subscription, Topic};
