use crate::model::value::EntityId;
use log::error;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

/// Event names carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    DragStart,
    DragEnd,
    SelectionChanged,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DragStart => "drag-start",
            Self::DragEnd => "drag-end",
            Self::SelectionChanged => "selection-changed",
        }
    }
}

/// Payload of every interaction event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub target: EntityId,
}

impl InteractionEvent {
    pub fn new(target: impl Into<EntityId>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

type Callback = Rc<dyn Fn(&InteractionEvent)>;

#[derive(Default)]
struct BusState {
    next_id: u64,
    topics: BTreeMap<Topic, Vec<(u64, Callback)>>,
}

impl BusState {
    fn is_registered(&self, topic: Topic, id: u64) -> bool {
        self.topics
            .get(&topic)
            .is_some_and(|entries| entries.iter().any(|(entry_id, _)| *entry_id == id))
    }
}

/// Single-threaded publish/subscribe bus. Clones share one registry.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `topic`.
    ///
    /// Registering the same closure twice delivers twice. Delivery stops
    /// when the returned handle is unsubscribed or dropped.
    pub fn subscribe(
        &self,
        topic: Topic,
        callback: impl Fn(&InteractionEvent) + 'static,
    ) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state
            .topics
            .entry(topic)
            .or_default()
            .push((id, Rc::new(callback)));
        Subscription {
            id,
            topic,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Invokes every subscriber of `topic`; returns how many ran to completion.
    pub fn publish(&self, topic: Topic, event: &InteractionEvent) -> usize {
        let targets: Vec<(u64, Callback)> = self
            .state
            .borrow()
            .topics
            .get(&topic)
            .map(|entries| entries.to_vec())
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, callback) in targets {
            // Skip subscribers released earlier in this same publish.
            if !self.state.borrow().is_registered(topic, id) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(
                    "event=bus_deliver module=events status=error topic={} target={} subscriber={}",
                    topic.as_str(),
                    event.target,
                    id
                ),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.state
            .borrow()
            .topics
            .get(&topic)
            .map_or(0, Vec::len)
    }
}

/// Registration handle; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    topic: Topic,
    state: Weak<RefCell<BusState>>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Releases the registration now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn release(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.borrow_mut();
        if let Some(entries) = state.topics.get_mut(&self.topic) {
            entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
