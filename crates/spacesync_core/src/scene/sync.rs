use crate::binding::{BindingState, ScopedBinding};
use crate::config::SyncConfig;
use crate::events::EventBus;
use crate::model::movable::{Movable, MovableKind};
use crate::model::space::Space;
use crate::model::value::EntityId;
use crate::scene::graph::{NodeId, SceneGraph, Transform};
use crate::scene::renderers::RendererRegistry;
use crate::spatial::{is_movable_visible, ProximityMetric, TrashcanWatcher};
use crate::store::access;
use crate::store::{EntityStore, StoreChange};
use futures::task::{LocalSpawn, LocalSpawnExt};
use glam::DVec3;
use log::{debug, error, info};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

struct MountedEntity {
    binding: ScopedBinding,
    node: Option<NodeId>,
    trashcan: Option<TrashcanWatcher>,
}

impl MountedEntity {
    fn release(self, graph: &dyn SceneGraph) {
        self.binding.detach();
        if let Some(node) = self.node {
            graph.despawn(node);
        }
    }
}

/// Scene view of one space: one node per member, keyed by entity id.
///
/// Every member gets its own `ScopedBinding`; its node is spawned once the
/// binding is bound and the entity's `space` field names this space.
pub struct SceneSync {
    this: Weak<SceneSync>,
    store: Rc<dyn EntityStore>,
    graph: Rc<dyn SceneGraph>,
    bus: EventBus,
    spawner: Rc<dyn LocalSpawn>,
    renderers: RendererRegistry,
    config: SyncConfig,
    space_id: EntityId,
    generation: Cell<u64>,
    mounted: Cell<bool>,
    entities: RefCell<BTreeMap<EntityId, MountedEntity>>,
}

impl SceneSync {
    pub fn new(
        store: Rc<dyn EntityStore>,
        graph: Rc<dyn SceneGraph>,
        bus: EventBus,
        spawner: Rc<dyn LocalSpawn>,
        renderers: RendererRegistry,
        space_id: impl Into<EntityId>,
        config: SyncConfig,
    ) -> Rc<Self> {
        let space_id = space_id.into();
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            store,
            graph,
            bus,
            spawner,
            renderers,
            config,
            space_id,
            generation: Cell::new(0),
            mounted: Cell::new(true),
            entities: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    /// Entity ids with a live node, in id order.
    pub fn rendered(&self) -> Vec<EntityId> {
        self.entities
            .borrow()
            .iter()
            .filter(|(_, entity)| entity.node.is_some())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn node_of(&self, entity_id: &str) -> Option<NodeId> {
        self.entities
            .borrow()
            .get(entity_id)
            .and_then(|entity| entity.node)
    }

    pub fn binding_state(&self, entity_id: &str) -> Option<BindingState> {
        self.entities
            .borrow()
            .get(entity_id)
            .map(|entity| entity.binding.state())
    }

    /// Re-reads the space and converges the scene onto its members.
    pub async fn sync(&self) {
        if !self.mounted.get() {
            return;
        }
        let generation = self.generation.get();
        let Some(space) = access::load_space(self.store.as_ref(), &self.space_id).await else {
            debug!(
                "event=scene_sync module=scene status=skip reason=space_unavailable space={}",
                self.space_id
            );
            return;
        };
        if !self.is_live(generation) {
            return;
        }

        let wanted: BTreeSet<EntityId> = space.movables.iter().cloned().collect();
        let departed: Vec<MountedEntity> = {
            let mut entities = self.entities.borrow_mut();
            let gone: Vec<EntityId> = entities
                .keys()
                .filter(|id| !wanted.contains(*id))
                .cloned()
                .collect();
            gone.iter().filter_map(|id| entities.remove(id)).collect()
        };
        for entity in departed {
            entity.release(self.graph.as_ref());
        }

        for id in &space.movables {
            self.ensure_binding(id);
        }
        for id in &space.movables {
            if !self.is_live(generation) {
                return;
            }
            self.refresh_entity(&space, id, generation).await;
        }
        debug!(
            "event=scene_sync module=scene status=ok space={} members={} rendered={}",
            self.space_id,
            space.movables.len(),
            self.rendered().len()
        );
    }

    /// Tears the scene down: detaches every binding, despawns every node and
    /// releases trashcan subscriptions. In-flight syncs stop applying.
    pub fn unmount(&self) {
        self.generation.set(self.generation.get() + 1);
        self.mounted.set(false);
        let entities = std::mem::take(&mut *self.entities.borrow_mut());
        let count = entities.len();
        for (_, entity) in entities {
            entity.release(self.graph.as_ref());
        }
        info!(
            "event=scene_unmount module=scene status=ok space={} released={}",
            self.space_id, count
        );
    }

    fn is_live(&self, generation: u64) -> bool {
        self.mounted.get() && self.generation.get() == generation
    }

    fn ensure_binding(&self, id: &str) {
        if self.entities.borrow().contains_key(id) {
            return;
        }
        let binding = ScopedBinding::new(self.store.clone());
        binding.retarget(Some(id));
        let this = self.this.clone();
        let spawner = self.spawner.clone();
        let entity_id = id.to_string();
        binding.set_listener(Some(Rc::new(move |_: &StoreChange| {
            let Some(scene) = this.upgrade() else {
                return;
            };
            let entity_id = entity_id.clone();
            let spawned = spawner.spawn_local(async move {
                scene.refresh_one(&entity_id).await;
            });
            if let Err(err) = spawned {
                error!(
                    "event=scene_refresh module=scene status=error reason=spawn error={}",
                    err
                );
            }
        })));
        self.entities.borrow_mut().insert(
            id.to_string(),
            MountedEntity {
                binding,
                node: None,
                trashcan: None,
            },
        );
    }

    async fn refresh_one(&self, entity_id: &str) {
        let generation = self.generation.get();
        if !self.is_live(generation) {
            return;
        }
        let Some(space) = access::load_space(self.store.as_ref(), &self.space_id).await else {
            return;
        };
        if self.is_live(generation) {
            self.refresh_entity(&space, entity_id, generation).await;
        }
    }

    async fn refresh_entity(&self, space: &Space, entity_id: &str, generation: u64) {
        let Some(binding) = self
            .entities
            .borrow()
            .get(entity_id)
            .map(|entity| entity.binding.clone())
        else {
            return;
        };

        // A miss may be transient (linked before the record materialized);
        // listed members get a fresh resolution on every pass.
        let listed = space.movables.iter().any(|id| id == entity_id);
        let state = match binding.state() {
            BindingState::Detached if listed => binding.refresh().await,
            _ => binding.resolve().await,
        };
        if !self.is_live(generation) {
            return;
        }
        let snapshot = match (state, binding.ticket()) {
            (BindingState::Bound, Some(ticket)) => {
                let movable = access::load_movable_with(self.store.as_ref(), &ticket.handle).await;
                if !self.is_live(generation) || !binding.is_current(&ticket) {
                    return;
                }
                movable
            }
            _ => None,
        };

        match snapshot.filter(|movable| movable.belongs_to(&space.id)) {
            Some(movable) => self.show(space, &movable),
            None => self.hide(entity_id),
        }
    }

    fn show(&self, space: &Space, movable: &Movable) {
        let transform = Transform {
            position: movable.position.unwrap_or(DVec3::ZERO),
            rotation: movable.rotation.unwrap_or(DVec3::ZERO),
        };
        let clipped = !is_movable_visible(space, movable, self.config.default_clipping);

        let mut entities = self.entities.borrow_mut();
        let Some(entity) = entities.get_mut(&movable.id) else {
            return;
        };
        match entity.node {
            Some(node) => self.graph.update(node, transform, clipped),
            None => {
                let Some(spec) = self.renderers.render(movable) else {
                    debug!(
                        "event=scene_render module=scene status=skip reason=no_renderer entity={} kind={}",
                        movable.id,
                        movable.kind().as_str()
                    );
                    return;
                };
                entity.node = Some(self.graph.spawn(spec, transform, clipped));
            }
        }

        if movable.kind() == MovableKind::Trashcan && entity.trashcan.is_none() {
            entity.trashcan = Some(TrashcanWatcher::attach(
                &self.bus,
                self.store.clone(),
                self.spawner.clone(),
                movable.id.clone(),
                ProximityMetric::World,
                self.config.trash_distance,
            ));
        }
    }

    fn hide(&self, entity_id: &str) {
        let mut entities = self.entities.borrow_mut();
        let Some(entity) = entities.get_mut(entity_id) else {
            return;
        };
        entity.trashcan = None;
        if let Some(node) = entity.node.take() {
            self.graph.despawn(node);
        }
    }
}

impl Drop for SceneSync {
    fn drop(&mut self) {
        for (_, entity) in std::mem::take(self.entities.get_mut()) {
            entity.binding.detach();
        }
    }
}
