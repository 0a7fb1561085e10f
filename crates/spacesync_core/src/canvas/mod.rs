//! Canvas sync layer: the 2D editor view of one space.
//!
//! # Responsibility
//! - Mirror editor drag, selection and hover state into entity properties.
//! - Draw one shape per rendered member and write dragged positions back.
//! - Maintain the locked title label of the space.
//! - Run planar trashcan watchers for trashcans drawn on this canvas.
//!
//! # Invariants
//! - Nothing is written after `unmount`; in-flight ticks observe the bumped
//!   generation and stop.
//! - Selection/hover reconciliation is a full recompute per interaction.

mod drag;
mod editor;
mod selection;
mod shapes;
mod title;

pub use drag::{DragDetector, DragTransition};
pub use editor::{
    entity_id_for_shape, hovered_entity, selected_entities, shape_id_for, title_shape_id,
    CanvasEditor, ShapeId, ShapeKind, ShapeSpec, ShapeUpdate,
};
pub use selection::{ReconcileReport, SelectionReconciler};
pub use shapes::ShapeProjector;
pub use title::TitleLabel;

use crate::config::SyncConfig;
use crate::events::{EventBus, InteractionEvent, Topic};
use crate::model::movable::{props, Movable, MovableKind};
use crate::model::space::Space;
use crate::model::value::EntityId;
use crate::spatial::{ProximityMetric, TrashcanWatcher};
use crate::store::access;
use crate::store::EntityStore;
use futures::task::LocalSpawn;
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Facade wiring every canvas-side synchronizer for one space.
///
/// The host calls `on_store_tick` on every editor store change and
/// `on_interaction` on every editor pointer/selection event, typically by
/// spawning the returned futures on its local executor.
pub struct CanvasSync {
    store: Rc<dyn EntityStore>,
    editor: Rc<dyn CanvasEditor>,
    bus: EventBus,
    spawner: Rc<dyn LocalSpawn>,
    config: SyncConfig,
    space_id: EntityId,
    generation: Cell<u64>,
    mounted: Cell<bool>,
    drag: DragDetector,
    selection: SelectionReconciler,
    shapes: ShapeProjector,
    title: TitleLabel,
    trashcans: RefCell<BTreeMap<EntityId, TrashcanWatcher>>,
}

impl CanvasSync {
    pub fn new(
        store: Rc<dyn EntityStore>,
        editor: Rc<dyn CanvasEditor>,
        bus: EventBus,
        spawner: Rc<dyn LocalSpawn>,
        space_id: impl Into<EntityId>,
        config: SyncConfig,
    ) -> Self {
        let space_id = space_id.into();
        let title = TitleLabel::new(&space_id, config.title_offset);
        Self {
            store,
            editor,
            bus,
            spawner,
            config,
            space_id,
            generation: Cell::new(0),
            mounted: Cell::new(false),
            drag: DragDetector::new(),
            selection: SelectionReconciler::new(),
            shapes: ShapeProjector::new(),
            title,
            trashcans: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn title(&self) -> &TitleLabel {
        &self.title
    }

    pub fn drawn(&self) -> Vec<EntityId> {
        self.shapes.drawn()
    }

    pub fn trashcan_ids(&self) -> Vec<EntityId> {
        self.trashcans.borrow().keys().cloned().collect()
    }

    /// Draws the space. Returns `false` when it does not resolve or the
    /// view was unmounted while loading.
    pub async fn mount(&self) -> bool {
        let generation = self.generation.get();
        let Some(space) = self.load_space(generation).await else {
            warn!(
                "event=canvas_mount module=canvas status=skip reason=space_unavailable space={}",
                self.space_id
            );
            return false;
        };
        self.mounted.set(true);
        self.title.mount(self.editor.as_ref(), &space);
        self.refresh(&space, generation).await;
        info!(
            "event=canvas_mount module=canvas status=ok space={} shapes={}",
            self.space_id,
            self.shapes.drawn().len()
        );
        true
    }

    /// Drag detection, position write-back and redraw for one store tick.
    pub async fn on_store_tick(&self) {
        if !self.mounted.get() {
            return;
        }
        let generation = self.generation.get();
        let Some(space) = self.load_space(generation).await else {
            return;
        };
        let live = || self.is_live(generation);

        match self.drag.observe(self.editor.as_ref()) {
            Some(DragTransition::Started(ids)) => {
                self.mark_dragging(&ids, true, generation).await;
            }
            Some(DragTransition::Ended(ids)) => {
                self.shapes
                    .write_back(self.store.as_ref(), self.editor.as_ref(), &space, &ids, &live)
                    .await;
                self.mark_dragging(&ids, false, generation).await;
            }
            None if self.drag.is_active() => {
                let ids = self.drag.dragged();
                self.shapes
                    .write_back(self.store.as_ref(), self.editor.as_ref(), &space, &ids, &live)
                    .await;
            }
            None => {}
        }

        if !self.is_live(generation) {
            return;
        }
        self.title.sync(self.editor.as_ref(), &space);
        self.refresh(&space, generation).await;
    }

    /// Selection/hover reconciliation for one editor interaction.
    ///
    /// `None` when the view is not mounted, or was unmounted mid-pass.
    pub async fn on_interaction(&self) -> Option<ReconcileReport> {
        if !self.mounted.get() {
            return None;
        }
        let generation = self.generation.get();
        let live = || self.is_live(generation);
        let report = self
            .selection
            .reconcile(self.store.as_ref(), self.editor.as_ref(), &self.bus, &live)
            .await;
        live().then_some(report)
    }

    /// Removes every canvas artifact and releases every subscription.
    pub fn unmount(&self) {
        self.generation.set(self.generation.get() + 1);
        if !self.mounted.replace(false) {
            return;
        }
        self.title.unmount(self.editor.as_ref());
        self.shapes.clear(self.editor.as_ref());
        self.trashcans.borrow_mut().clear();
        self.drag.reset();
        self.selection.reset();
        info!(
            "event=canvas_unmount module=canvas status=ok space={}",
            self.space_id
        );
    }

    fn is_live(&self, generation: u64) -> bool {
        self.mounted.get() && self.generation.get() == generation
    }

    async fn load_space(&self, generation: u64) -> Option<Space> {
        let space = access::load_space(self.store.as_ref(), &self.space_id).await?;
        (self.generation.get() == generation).then_some(space)
    }

    async fn refresh(&self, space: &Space, generation: u64) {
        let members = ShapeProjector::load_members(self.store.as_ref(), space).await;
        if !self.is_live(generation) {
            return;
        }
        self.shapes.project(
            self.editor.as_ref(),
            space,
            &members,
            self.config.default_clipping,
            &self.drag.dragged(),
        );
        self.sync_trashcans(space, &members);
    }

    async fn mark_dragging(&self, ids: &[EntityId], dragging: bool, generation: u64) {
        let topic = if dragging {
            Topic::DragStart
        } else {
            Topic::DragEnd
        };
        for id in ids {
            if !self.is_live(generation) {
                return;
            }
            let Some(handle) = access::resolve(self.store.as_ref(), id).await else {
                continue;
            };
            if !self.is_live(generation) {
                return;
            }
            access::write(
                self.store.as_ref(),
                &handle,
                props::BEING_DRAGGED,
                dragging.into(),
            )
            .await;
            self.bus.publish(topic, &InteractionEvent::new(id.as_str()));
        }
        debug!(
            "event=canvas_drag module=canvas status=ok topic={} count={}",
            topic.as_str(),
            ids.len()
        );
    }

    fn sync_trashcans(&self, space: &Space, members: &[Movable]) {
        let metric = ProximityMetric::Canvas(space.plane());
        let mut trashcans = self.trashcans.borrow_mut();
        trashcans.retain(|id, _| {
            members
                .iter()
                .any(|movable| &movable.id == id && movable.kind() == MovableKind::Trashcan)
        });
        for movable in members {
            if movable.kind() != MovableKind::Trashcan {
                continue;
            }
            match trashcans.get(&movable.id) {
                Some(watcher) => {
                    if watcher.metric() != metric {
                        watcher.set_metric(metric);
                    }
                }
                None => {
                    let watcher = TrashcanWatcher::attach(
                        &self.bus,
                        self.store.clone(),
                        self.spawner.clone(),
                        movable.id.clone(),
                        metric,
                        self.config.trash_distance,
                    );
                    trashcans.insert(movable.id.clone(), watcher);
                }
            }
        }
    }
}
