//! Listener bookkeeping shared by store implementations.

use crate::model::value::EntityId;
use crate::store::adapter::{ChangeListener, ListenerId, ReloadListener, StoreChange};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

enum Registration {
    Change {
        scope: Option<EntityId>,
        listener: ChangeListener,
    },
    Reload(ReloadListener),
}

/// Registration table for change and reload listeners.
///
/// Delivery snapshots matching listeners before invoking any of them, so
/// listeners may register, unregister or write back into the store.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: Cell<u64>,
    entries: RefCell<BTreeMap<ListenerId, Registration>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_change(&self, scope: Option<&str>, listener: ChangeListener) -> ListenerId {
        self.insert(Registration::Change {
            scope: scope.map(str::to_string),
            listener,
        })
    }

    pub fn add_reload(&self, listener: ReloadListener) -> ListenerId {
        self.insert(Registration::Reload(listener))
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        self.entries.borrow_mut().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Delivers `change` to global watchers and watchers of its entity.
    pub fn notify_change(&self, change: &StoreChange) {
        let targets: Vec<(ListenerId, ChangeListener)> = self
            .entries
            .borrow()
            .iter()
            .filter_map(|(id, entry)| match entry {
                Registration::Change { scope, listener }
                    if scope
                        .as_deref()
                        .map_or(true, |scope| scope == change.entity_id()) =>
                {
                    Some((*id, listener.clone()))
                }
                _ => None,
            })
            .collect();

        for (id, listener) in targets {
            // A listener earlier in this round may have released this one.
            if self.entries.borrow().contains_key(&id) {
                listener(change);
            }
        }
    }

    pub fn notify_reloaded(&self) {
        let targets: Vec<(ListenerId, ReloadListener)> = self
            .entries
            .borrow()
            .iter()
            .filter_map(|(id, entry)| match entry {
                Registration::Reload(listener) => Some((*id, listener.clone())),
                Registration::Change { .. } => None,
            })
            .collect();

        for (id, listener) in targets {
            if self.entries.borrow().contains_key(&id) {
                listener();
            }
        }
    }

    fn insert(&self, registration: Registration) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().insert(id, registration);
        id
    }
}
