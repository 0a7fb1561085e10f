use crate::model::value::{EntityId, PropertyValue};
use crate::store::access;
use crate::store::{EntityHandle, EntityStore, ListenerId, StoreChange};
use log::debug;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Lifecycle of the binding for its current identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Identifier unknown, or known and not yet resolving.
    Unbound,
    /// `resolve` is in flight.
    Resolving,
    /// Handle obtained; reads, writes and change delivery are live.
    Bound,
    /// Identifier replaced, entity gone, or binding torn down.
    Detached,
}

pub type BindingListener = Rc<dyn Fn(&StoreChange)>;

/// Proof that a binding was bound to one identity at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTicket {
    generation: u64,
    pub handle: EntityHandle,
}

struct Slot {
    generation: u64,
    target: Option<EntityId>,
    state: BindingState,
    handle: Option<EntityHandle>,
    watch: Option<ListenerId>,
}

impl Slot {
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state == BindingState::Bound
    }

    fn advance(&mut self) -> Option<ListenerId> {
        self.generation += 1;
        self.handle = None;
        self.watch.take()
    }
}

/// Scoped handle linking one view node to one entity identity.
///
/// Clones share state, so async tasks spawned by the owning node observe
/// the same identity. The owner calls `detach` on teardown.
#[derive(Clone)]
pub struct ScopedBinding {
    store: Rc<dyn EntityStore>,
    slot: Rc<RefCell<Slot>>,
    listener: Rc<RefCell<Option<BindingListener>>>,
}

impl ScopedBinding {
    pub fn new(store: Rc<dyn EntityStore>) -> Self {
        Self {
            store,
            slot: Rc::new(RefCell::new(Slot {
                generation: 0,
                target: None,
                state: BindingState::Unbound,
                handle: None,
                watch: None,
            })),
            listener: Rc::new(RefCell::new(None)),
        }
    }

    pub fn state(&self) -> BindingState {
        self.slot.borrow().state
    }

    pub fn target(&self) -> Option<EntityId> {
        self.slot.borrow().target.clone()
    }

    /// Handle of the bound entity; `None` unless `Bound`.
    pub fn handle(&self) -> Option<EntityHandle> {
        let slot = self.slot.borrow();
        match slot.state {
            BindingState::Bound => slot.handle.clone(),
            _ => None,
        }
    }

    pub fn ticket(&self) -> Option<BindingTicket> {
        let slot = self.slot.borrow();
        match (slot.state, &slot.handle) {
            (BindingState::Bound, Some(handle)) => Some(BindingTicket {
                generation: slot.generation,
                handle: handle.clone(),
            }),
            _ => None,
        }
    }

    /// Whether `ticket` still names the live identity of this binding.
    pub fn is_current(&self, ticket: &BindingTicket) -> bool {
        self.slot.borrow().is_current(ticket.generation)
    }

    /// Sets the callback receiving changes of the bound entity.
    pub fn set_listener(&self, listener: Option<BindingListener>) {
        *self.listener.borrow_mut() = listener;
    }

    /// Points the binding at `target`.
    ///
    /// Returns `false` when the identifier is unchanged and the binding is
    /// still live, so property-only updates never tear the binding down.
    pub fn retarget(&self, target: Option<&str>) -> bool {
        let released = {
            let mut slot = self.slot.borrow_mut();
            let unchanged = slot.target.as_deref() == target;
            if unchanged && slot.state != BindingState::Detached {
                return false;
            }
            let released = slot.advance();
            slot.target = target.map(str::to_string);
            slot.state = BindingState::Unbound;
            released
        };
        self.release(released);
        true
    }

    /// Resolves the current target when the binding is `Unbound`.
    ///
    /// A result arriving after the identity changed or the binding was
    /// detached is dropped; the returned state is the binding's state at
    /// completion.
    pub async fn resolve(&self) -> BindingState {
        let (generation, target) = {
            let mut slot = self.slot.borrow_mut();
            let Some(target) = slot.target.clone() else {
                return slot.state;
            };
            if slot.state != BindingState::Unbound {
                return slot.state;
            }
            slot.state = BindingState::Resolving;
            (slot.generation, target)
        };

        let resolved = access::resolve(self.store.as_ref(), &target).await;

        let handle = {
            let mut slot = self.slot.borrow_mut();
            if slot.generation != generation || slot.state != BindingState::Resolving {
                debug!(
                    "event=binding_resolve module=binding status=skip reason=stale entity={}",
                    target
                );
                return slot.state;
            }
            match resolved {
                Some(handle) => {
                    slot.state = BindingState::Bound;
                    slot.handle = Some(handle.clone());
                    handle
                }
                None => {
                    slot.state = BindingState::Detached;
                    debug!(
                        "event=binding_resolve module=binding status=skip reason=not_found entity={}",
                        target
                    );
                    return BindingState::Detached;
                }
            }
        };

        let watch = self
            .store
            .watch(Some(&handle.id), self.change_forwarder(generation));
        self.slot.borrow_mut().watch = Some(watch);
        BindingState::Bound
    }

    /// Retargets to `target` and resolves it.
    pub async fn bind(&self, target: &str) -> BindingState {
        self.retarget(Some(target));
        self.resolve().await
    }

    /// Re-resolves the same identifier after a miss.
    pub async fn refresh(&self) -> BindingState {
        let released = {
            let mut slot = self.slot.borrow_mut();
            if slot.state != BindingState::Detached || slot.target.is_none() {
                return slot.state;
            }
            let released = slot.advance();
            slot.state = BindingState::Unbound;
            released
        };
        self.release(released);
        self.resolve().await
    }

    /// Reads a property of the bound entity.
    pub async fn get(&self, name: &str) -> Option<PropertyValue> {
        let ticket = self.ticket()?;
        let value = access::read(self.store.as_ref(), &ticket.handle, name).await;
        if self.is_current(&ticket) {
            value
        } else {
            None
        }
    }

    /// Writes a property of the bound entity; a no-op once detached.
    pub async fn set(&self, name: &str, value: PropertyValue) -> bool {
        let Some(ticket) = self.ticket() else {
            debug!(
                "event=binding_write module=binding status=skip reason=not_bound name={}",
                name
            );
            return false;
        };
        access::write(self.store.as_ref(), &ticket.handle, name, value).await
    }

    /// Tears the binding down: releases subscriptions and invalidates every
    /// outstanding resolution, ticket and write.
    pub fn detach(&self) {
        let released = {
            let mut slot = self.slot.borrow_mut();
            let released = slot.advance();
            slot.state = BindingState::Detached;
            released
        };
        self.release(released);
        self.listener.borrow_mut().take();
    }

    fn release(&self, watch: Option<ListenerId>) {
        if let Some(watch) = watch {
            self.store.remove_listener(watch);
        }
    }

    fn change_forwarder(&self, generation: u64) -> Rc<dyn Fn(&StoreChange)> {
        let slot: Weak<RefCell<Slot>> = Rc::downgrade(&self.slot);
        let store: Weak<dyn EntityStore> = Rc::downgrade(&self.store);
        let listener = Rc::downgrade(&self.listener);
        Rc::new(move |change: &StoreChange| {
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let released = {
                let mut slot = slot.borrow_mut();
                if !slot.is_current(generation) {
                    return;
                }
                if matches!(change, StoreChange::Deleted { .. }) {
                    slot.state = BindingState::Detached;
                    slot.handle = None;
                    slot.watch.take()
                } else {
                    None
                }
            };
            if let (Some(watch), Some(store)) = (released, store.upgrade()) {
                store.remove_listener(watch);
            }
            let Some(listener) = listener.upgrade() else {
                return;
            };
            let callback = listener.borrow().clone();
            if let Some(callback) = callback {
                callback(change);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BindingState, ScopedBinding};
    use crate::model::value::PropertyMap;
    use crate::store::{EntityStore, SqliteEntityStore, StoreChange};
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (Rc<SqliteEntityStore>, String, String) {
        let store = Rc::new(SqliteEntityStore::open_in_memory().expect("store"));
        let (a, b) = block_on(async {
            (
                store.create("Note", PropertyMap::new()).await.expect("a"),
                store.create("Note", PropertyMap::new()).await.expect("b"),
            )
        });
        (store, a, b)
    }

    #[test]
    fn binds_and_reads_live_values() {
        let (store, a, _) = setup();
        let binding = ScopedBinding::new(store.clone());
        block_on(async {
            assert_eq!(binding.bind(&a).await, BindingState::Bound);
            assert!(binding.set("text", "hi".into()).await);
            assert_eq!(binding.get("text").await, Some("hi".into()));
        });
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn same_identifier_keeps_the_binding() {
        let (store, a, _) = setup();
        let binding = ScopedBinding::new(store.clone());
        block_on(binding.bind(&a));
        let ticket = binding.ticket().expect("bound");

        assert!(!binding.retarget(Some(&a)));
        assert!(binding.is_current(&ticket));
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn identity_change_releases_subscriptions_first() {
        let (store, a, b) = setup();
        let binding = ScopedBinding::new(store.clone());
        block_on(binding.bind(&a));
        let stale = binding.ticket().expect("bound to a");

        assert!(binding.retarget(Some(&b)));
        assert_eq!(store.listener_count(), 0);
        assert!(!binding.is_current(&stale));
        assert_eq!(binding.state(), BindingState::Unbound);

        assert_eq!(block_on(binding.resolve()), BindingState::Bound);
        assert_eq!(binding.handle().map(|handle| handle.id), Some(b));
    }

    #[test]
    fn missing_entity_detaches_and_refresh_can_recover() {
        let (store, _, _) = setup();
        let binding = ScopedBinding::new(store.clone());
        assert_eq!(block_on(binding.bind("ghost")), BindingState::Detached);
        assert!(!block_on(binding.set("text", "x".into())));
        assert_eq!(block_on(binding.refresh()), BindingState::Detached);
    }

    #[test]
    fn deletion_detaches_and_forwards_change() {
        let (store, a, _) = setup();
        let binding = ScopedBinding::new(store.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        binding.set_listener(Some(Rc::new(move |change: &StoreChange| {
            sink.borrow_mut().push(change.clone())
        })));

        block_on(async {
            binding.bind(&a).await;
            binding.set("selected", true.into()).await;
            store.delete(&a).await.expect("delete");
        });

        assert_eq!(binding.state(), BindingState::Detached);
        assert_eq!(store.listener_count(), 0);
        assert_eq!(seen.borrow().len(), 2);
        assert!(matches!(seen.borrow()[1], StoreChange::Deleted { .. }));
    }

    #[test]
    fn detach_silences_listener_and_writes() {
        let (store, a, _) = setup();
        let binding = ScopedBinding::new(store.clone());
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        binding.set_listener(Some(Rc::new(move |_: &StoreChange| {
            *counter.borrow_mut() += 1
        })));
        block_on(binding.bind(&a));
        binding.detach();

        block_on(async {
            assert!(!binding.set("text", "late".into()).await);
            let handle = store.resolve(&a).await.expect("resolve").expect("exists");
            store
                .set_property(&handle, "text", "remote".into())
                .await
                .expect("remote write");
        });
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(store.listener_count(), 0);
    }
}
