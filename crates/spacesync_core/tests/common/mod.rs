#![allow(dead_code)]

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawn;
use glam::{DVec2, DVec3};
use spacesync_core::canvas::{shape_id_for, CanvasEditor, ShapeId, ShapeSpec, ShapeUpdate};
use spacesync_core::scene::{NodeId, NodeSpec, SceneGraph, Transform};
use spacesync_core::store::{
    ChangeListener, EntityHandle, EntityStore, ListenerId, PropertyFilter, ReloadListener,
    StoreResult,
};
use spacesync_core::{EntityId, PropertyMap, PropertyValue, SqliteEntityStore};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub fn store() -> Rc<SqliteEntityStore> {
    Rc::new(SqliteEntityStore::open_in_memory().unwrap())
}

pub fn spawner(pool: &LocalPool) -> Rc<dyn LocalSpawn> {
    Rc::new(pool.spawner())
}

pub fn read(pool: &mut LocalPool, store: &dyn EntityStore, id: &str, name: &str) -> Option<PropertyValue> {
    pool.run_until(async {
        match store.resolve(id).await.unwrap() {
            Some(handle) => store.get_property(&handle, name).await.unwrap(),
            None => None,
        }
    })
}

pub fn write(pool: &mut LocalPool, store: &dyn EntityStore, id: &str, name: &str, value: PropertyValue) {
    pool.run_until(async {
        let handle = store.resolve(id).await.unwrap().unwrap();
        store.set_property(&handle, name, value).await.unwrap();
    })
}

pub fn exists(pool: &mut LocalPool, store: &dyn EntityStore, id: &str) -> bool {
    pool.run_until(store.resolve(id)).unwrap().is_some()
}

pub fn members(pool: &mut LocalPool, store: &dyn EntityStore, space_id: &str) -> Vec<EntityId> {
    read(pool, store, space_id, "movables")
        .and_then(|value| value.as_id_list().map(<[EntityId]>::to_vec))
        .unwrap_or_default()
}

pub fn vec3(x: f64, y: f64, z: f64) -> PropertyValue {
    PropertyValue::Vec3(DVec3::new(x, y, z))
}

/// In-memory 2D editor.
#[derive(Default)]
pub struct FakeEditor {
    pub shapes: RefCell<BTreeMap<ShapeId, ShapeSpec>>,
    pub selected: RefCell<Vec<ShapeId>>,
    pub hovered: RefCell<Option<ShapeId>>,
    pub dragging: Cell<bool>,
    pub locked_delete_attempts: Cell<usize>,
    pub deleted: RefCell<Vec<ShapeId>>,
}

impl FakeEditor {
    pub fn select(&self, entity_ids: &[&str]) {
        *self.selected.borrow_mut() = entity_ids.iter().map(|id| shape_id_for(id)).collect();
    }

    pub fn hover(&self, entity_id: Option<&str>) {
        *self.hovered.borrow_mut() = entity_id.map(shape_id_for);
    }

    pub fn move_shape(&self, entity_id: &str, position: DVec2) {
        if let Some(shape) = self.shapes.borrow_mut().get_mut(&shape_id_for(entity_id)) {
            shape.position = position;
        }
    }

    pub fn shape_of(&self, entity_id: &str) -> Option<ShapeSpec> {
        self.shapes.borrow().get(&shape_id_for(entity_id)).cloned()
    }
}

impl CanvasEditor for FakeEditor {
    fn selected_shape_ids(&self) -> Vec<ShapeId> {
        self.selected.borrow().clone()
    }

    fn hovered_shape_id(&self) -> Option<ShapeId> {
        self.hovered.borrow().clone()
    }

    fn is_dragging(&self) -> bool {
        self.dragging.get()
    }

    fn shape(&self, id: &str) -> Option<ShapeSpec> {
        self.shapes.borrow().get(id).cloned()
    }

    fn create_shape(&self, spec: ShapeSpec) {
        self.shapes.borrow_mut().insert(spec.id.clone(), spec);
    }

    fn update_shape(&self, id: &str, update: ShapeUpdate) {
        let mut shapes = self.shapes.borrow_mut();
        let Some(shape) = shapes.get_mut(id) else {
            return;
        };
        if let Some(position) = update.position {
            shape.position = position;
        }
        if let Some(size) = update.size {
            shape.size = size;
        }
        if let Some(text) = update.text {
            shape.text = Some(text);
        }
        if let Some(locked) = update.locked {
            shape.locked = locked;
        }
        if let Some(clipped) = update.clipped {
            shape.clipped = clipped;
        }
    }

    fn delete_shape(&self, id: &str) {
        let mut shapes = self.shapes.borrow_mut();
        if shapes.get(id).is_some_and(|shape| shape.locked) {
            self.locked_delete_attempts
                .set(self.locked_delete_attempts.get() + 1);
            return;
        }
        if shapes.remove(id).is_some() {
            self.deleted.borrow_mut().push(id.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeNode {
    pub spec: NodeSpec,
    pub transform: Transform,
    pub clipped: bool,
}

/// In-memory scene graph.
#[derive(Default)]
pub struct FakeScene {
    next: Cell<NodeId>,
    pub nodes: RefCell<BTreeMap<NodeId, FakeNode>>,
    pub spawn_count: Cell<usize>,
}

impl FakeScene {
    pub fn node(&self, node: NodeId) -> Option<FakeNode> {
        self.nodes.borrow().get(&node).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }
}

impl SceneGraph for FakeScene {
    fn spawn(&self, spec: NodeSpec, transform: Transform, clipped: bool) -> NodeId {
        let node = self.next.get() + 1;
        self.next.set(node);
        self.spawn_count.set(self.spawn_count.get() + 1);
        self.nodes.borrow_mut().insert(
            node,
            FakeNode {
                spec,
                transform,
                clipped,
            },
        );
        node
    }

    fn update(&self, node: NodeId, transform: Transform, clipped: bool) {
        if let Some(existing) = self.nodes.borrow_mut().get_mut(&node) {
            existing.transform = transform;
            existing.clipped = clipped;
        }
    }

    fn despawn(&self, node: NodeId) {
        self.nodes.borrow_mut().remove(&node);
    }
}

/// Store wrapper that can park `resolve` calls until released, report
/// chosen ids as missing, and records every `set_property` call.
pub struct DelayedStore {
    inner: Rc<SqliteEntityStore>,
    holding: Cell<bool>,
    hidden: RefCell<BTreeSet<EntityId>>,
    parked: RefCell<Vec<oneshot::Sender<()>>>,
    writes: RefCell<Vec<(EntityId, String)>>,
}

impl DelayedStore {
    pub fn new(inner: Rc<SqliteEntityStore>) -> Rc<Self> {
        Rc::new(Self {
            inner,
            holding: Cell::new(false),
            hidden: RefCell::new(BTreeSet::new()),
            parked: RefCell::new(Vec::new()),
            writes: RefCell::new(Vec::new()),
        })
    }

    pub fn inner(&self) -> &SqliteEntityStore {
        &self.inner
    }

    pub fn hold(&self) {
        self.holding.set(true);
    }

    /// Stops parking and wakes every parked resolve.
    pub fn release(&self) {
        self.holding.set(false);
        for sender in self.parked.borrow_mut().drain(..) {
            let _ = sender.send(());
        }
    }

    /// Makes `resolve(id)` report a miss until `unhide`.
    pub fn hide(&self, id: &str) {
        self.hidden.borrow_mut().insert(id.to_string());
    }

    pub fn unhide(&self, id: &str) {
        self.hidden.borrow_mut().remove(id);
    }

    pub fn parked(&self) -> usize {
        self.parked.borrow().len()
    }

    pub fn writes(&self) -> Vec<(EntityId, String)> {
        self.writes.borrow().clone()
    }
}

impl EntityStore for DelayedStore {
    fn resolve<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<EntityHandle>>> {
        let gate = if self.holding.get() {
            let (sender, receiver) = oneshot::channel();
            self.parked.borrow_mut().push(sender);
            Some(receiver)
        } else {
            None
        };
        async move {
            if let Some(receiver) = gate {
                let _ = receiver.await;
            }
            if self.hidden.borrow().contains(id) {
                return Ok(None);
            }
            self.inner.resolve(id).await
        }
        .boxed_local()
    }

    fn get_property<'a>(
        &'a self,
        handle: &'a EntityHandle,
        name: &'a str,
    ) -> LocalBoxFuture<'a, StoreResult<Option<PropertyValue>>> {
        self.inner.get_property(handle, name)
    }

    fn set_property<'a>(
        &'a self,
        handle: &'a EntityHandle,
        name: &'a str,
        value: PropertyValue,
    ) -> LocalBoxFuture<'a, StoreResult<()>> {
        self.writes
            .borrow_mut()
            .push((handle.id.clone(), name.to_string()));
        self.inner.set_property(handle, name, value)
    }

    fn create<'a>(
        &'a self,
        type_tag: &'a str,
        initial: PropertyMap,
    ) -> LocalBoxFuture<'a, StoreResult<EntityId>> {
        self.inner.create(type_tag, initial)
    }

    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, StoreResult<()>> {
        self.inner.delete(id)
    }

    fn query_by_type<'a>(
        &'a self,
        type_tag: &'a str,
        filter: Option<&'a PropertyFilter>,
    ) -> LocalBoxFuture<'a, StoreResult<Vec<EntityId>>> {
        self.inner.query_by_type(type_tag, filter)
    }

    fn all_types_implementing<'a>(
        &'a self,
        capability: &'a str,
    ) -> LocalBoxFuture<'a, StoreResult<Vec<String>>> {
        self.inner.all_types_implementing(capability)
    }

    fn watch(&self, id: Option<&str>, listener: ChangeListener) -> ListenerId {
        self.inner.watch(id, listener)
    }

    fn on_reloaded(&self, listener: ReloadListener) -> ListenerId {
        self.inner.on_reloaded(listener)
    }

    fn remove_listener(&self, listener: ListenerId) {
        self.inner.remove_listener(listener)
    }
}
