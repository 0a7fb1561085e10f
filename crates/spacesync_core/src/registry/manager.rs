use crate::model::value::{EntityId, PropertyMap};
use crate::store::{EntityStore, ListenerId, StoreResult};
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Type tag of the singleton holding the current space selection.
pub const SPACE_MANAGER_TYPE: &str = "SpaceManager";

/// Registry keyed by manager type tag.
pub struct ManagerRegistry {
    store: Rc<dyn EntityStore>,
    types: RefCell<BTreeSet<String>>,
    instances: RefCell<BTreeMap<String, EntityId>>,
    reload_watch: Cell<Option<ListenerId>>,
}

impl ManagerRegistry {
    /// Creates a registry with the default managers registered.
    pub fn new(store: Rc<dyn EntityStore>) -> Self {
        let registry = Self::empty(store);
        registry.register(SPACE_MANAGER_TYPE);
        registry
    }

    pub fn empty(store: Rc<dyn EntityStore>) -> Self {
        Self {
            store,
            types: RefCell::new(BTreeSet::new()),
            instances: RefCell::new(BTreeMap::new()),
            reload_watch: Cell::new(None),
        }
    }

    /// Registers a singleton type; returns `false` when already present.
    pub fn register(&self, type_tag: &str) -> bool {
        self.types.borrow_mut().insert(type_tag.to_string())
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.types.borrow().iter().cloned().collect()
    }

    /// Last known instance id for `type_tag`.
    pub fn manager_id(&self, type_tag: &str) -> Option<EntityId> {
        self.instances.borrow().get(type_tag).cloned()
    }

    /// Makes sure exactly one entity of `type_tag` exists and returns its id.
    ///
    /// # Errors
    /// - Store errors from the query, create or delete calls.
    pub async fn ensure_exists(&self, type_tag: &str) -> StoreResult<EntityId> {
        let mut ids = self.store.query_by_type(type_tag, None).await?;
        let id = if ids.is_empty() {
            let id = self.store.create(type_tag, PropertyMap::new()).await?;
            info!(
                "event=manager_ensure module=registry status=ok action=created type={} entity={}",
                type_tag, id
            );
            id
        } else {
            let keep = ids.remove(0);
            for duplicate in ids {
                match self.store.delete(&duplicate).await {
                    Ok(()) => warn!(
                        "event=manager_ensure module=registry status=ok action=dedupe type={} entity={}",
                        type_tag, duplicate
                    ),
                    Err(err) if err.is_not_found() => {}
                    Err(err) => return Err(err),
                }
            }
            debug!(
                "event=manager_ensure module=registry status=ok action=kept type={} entity={}",
                type_tag, keep
            );
            keep
        };
        self.instances
            .borrow_mut()
            .insert(type_tag.to_string(), id.clone());
        Ok(id)
    }

    /// Runs `ensure_exists` for every registered type.
    pub async fn ensure_all(&self) -> StoreResult<()> {
        for type_tag in self.registered_types() {
            self.ensure_exists(&type_tag).await?;
        }
        Ok(())
    }

    /// Re-runs `ensure_all` on `spawner` after every store reload.
    ///
    /// Replaces a previous registration. The listener holds the registry
    /// weakly; dropping the last `Rc` stops further runs.
    pub fn watch_reloads(self: &Rc<Self>, spawner: Rc<dyn LocalSpawn>) {
        self.stop_watching();
        let registry = Rc::downgrade(self);
        let listener = self.store.on_reloaded(Rc::new(move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            let spawned = spawner.spawn_local(async move {
                if let Err(err) = registry.ensure_all().await {
                    error!(
                        "event=manager_reload module=registry status=error error={}",
                        err
                    );
                }
            });
            if let Err(err) = spawned {
                error!(
                    "event=manager_reload module=registry status=error reason=spawn error={}",
                    err
                );
            }
        }));
        self.reload_watch.set(Some(listener));
    }

    pub fn stop_watching(&self) {
        if let Some(listener) = self.reload_watch.take() {
            self.store.remove_listener(listener);
        }
    }
}

impl Drop for ManagerRegistry {
    fn drop(&mut self) {
        self.stop_watching();
    }
}
