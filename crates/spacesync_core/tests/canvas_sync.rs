mod common;

use approx::assert_abs_diff_eq;
use common::{exists, read, spawner, DelayedStore, FakeEditor};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use glam::{DVec2, DVec3};
use spacesync_core::canvas::{title_shape_id, ShapeKind};
use spacesync_core::{
    CanvasSync, CreateSpaceRequest, EventBus, ManagerRegistry, MovablePayload, PropertyValue,
    SpaceService, SpawnMovableRequest, SqliteEntityStore, SyncConfig, Topic,
};
use std::cell::RefCell;
use std::rc::Rc;

struct Fixture {
    pool: LocalPool,
    store: Rc<SqliteEntityStore>,
    service: SpaceService,
    editor: Rc<FakeEditor>,
    bus: EventBus,
    space: String,
}

impl Fixture {
    fn new() -> Self {
        let store = common::store();
        let service =
            SpaceService::new(store.clone(), Rc::new(ManagerRegistry::new(store.clone())));
        let mut pool = LocalPool::new();
        let request = CreateSpaceRequest::new("Studio", DVec3::ZERO, DVec3::new(4.0, 2.0, 4.0));
        let space = pool.run_until(service.create_space(&request)).unwrap();
        Self {
            pool,
            store,
            service,
            editor: Rc::new(FakeEditor::default()),
            bus: EventBus::new(),
            space,
        }
    }

    fn spawn(&mut self, payload: MovablePayload, at: DVec3) -> String {
        let request = SpawnMovableRequest::new(payload, at).in_space(self.space.clone());
        self.pool
            .run_until(self.service.spawn_movable(&request))
            .unwrap()
    }

    fn note(&mut self, at: DVec3) -> String {
        self.spawn(
            MovablePayload::Note {
                text: "hello".to_string(),
            },
            at,
        )
    }

    fn canvas(&self) -> CanvasSync {
        CanvasSync::new(
            self.store.clone(),
            self.editor.clone(),
            self.bus.clone(),
            spawner(&self.pool),
            self.space.clone(),
            SyncConfig::default(),
        )
    }

    fn record(&self, topic: Topic) -> (Rc<RefCell<Vec<String>>>, spacesync_core::Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = self
            .bus
            .subscribe(topic, move |event| sink.borrow_mut().push(event.target.clone()));
        (seen, subscription)
    }

    fn tick(&mut self, canvas: &CanvasSync) {
        self.pool.run_until(canvas.on_store_tick());
        self.pool.run_until_stalled();
    }
}

#[test]
fn mount_draws_members_and_locked_title() {
    let mut fx = Fixture::new();
    let entity = fx.note(DVec3::new(0.5, 0.3, -0.25));
    let canvas = fx.canvas();

    assert!(fx.pool.run_until(canvas.mount()));

    let shape = fx.editor.shape_of(&entity).unwrap();
    assert_eq!(shape.kind, ShapeKind::Movable(spacesync_core::MovableKind::Note));
    assert_abs_diff_eq!(shape.position.x, 200.0, epsilon = 1e-9);
    assert_abs_diff_eq!(shape.position.y, -100.0, epsilon = 1e-9);
    assert_eq!(shape.size, DVec2::splat(80.0));
    assert!(!shape.clipped);

    let title = fx.editor.shapes.borrow()[&title_shape_id(&fx.space)].clone();
    assert!(title.locked);
    assert_eq!(title.text.as_deref(), Some("Studio"));
    assert_abs_diff_eq!(title.position.y, -800.0 - 48.0, epsilon = 1e-9);
}

#[test]
fn mount_fails_soft_for_missing_space() {
    let fx = Fixture::new();
    let canvas = CanvasSync::new(
        fx.store.clone(),
        fx.editor.clone(),
        fx.bus.clone(),
        spawner(&fx.pool),
        "missing",
        SyncConfig::default(),
    );
    let mut pool = LocalPool::new();
    assert!(!pool.run_until(canvas.mount()));
    assert!(fx.editor.shapes.borrow().is_empty());
}

#[test]
fn title_follows_rename() {
    let mut fx = Fixture::new();
    let canvas = fx.canvas();
    fx.pool.run_until(canvas.mount());

    let space = fx.space.clone();
    fx.pool
        .run_until(fx.service.rename_space(&space, "Gallery"))
        .unwrap();
    fx.tick(&canvas);

    let title = fx.editor.shapes.borrow()[&title_shape_id(&space)].clone();
    assert_eq!(title.text.as_deref(), Some("Gallery"));
}

#[test]
fn drag_writes_flags_positions_and_events() {
    let mut fx = Fixture::new();
    let entity = fx.note(DVec3::new(0.5, 0.3, -0.25));
    let canvas = fx.canvas();
    fx.pool.run_until(canvas.mount());
    let (starts, _start_sub) = fx.record(Topic::DragStart);
    let (ends, _end_sub) = fx.record(Topic::DragEnd);

    fx.editor.select(&[entity.as_str()]);
    fx.editor.dragging.set(true);
    fx.tick(&canvas);
    assert_eq!(*starts.borrow(), vec![entity.clone()]);
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &entity, "beingDragged"),
        Some(PropertyValue::Bool(true))
    );

    fx.editor.move_shape(&entity, DVec2::new(400.0, 0.0));
    fx.tick(&canvas);
    let position = read(&mut fx.pool, fx.store.as_ref(), &entity, "position")
        .and_then(|value| value.as_vec3())
        .unwrap();
    assert_abs_diff_eq!(position.x, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(position.y, 0.3, epsilon = 1e-9);
    assert_abs_diff_eq!(position.z, 0.0, epsilon = 1e-9);
    assert_eq!(fx.editor.shape_of(&entity).unwrap().position, DVec2::new(400.0, 0.0));

    fx.editor.dragging.set(false);
    fx.tick(&canvas);
    assert_eq!(*ends.borrow(), vec![entity.clone()]);
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &entity, "beingDragged"),
        Some(PropertyValue::Bool(false))
    );

    fx.tick(&canvas);
    assert_eq!(starts.borrow().len(), 1);
    assert_eq!(ends.borrow().len(), 1);
}

#[test]
fn selection_and_hover_are_reconciled_in_full() {
    let mut fx = Fixture::new();
    let a = fx.note(DVec3::ZERO);
    let b = fx.note(DVec3::new(0.5, 0.0, 0.0));
    let canvas = fx.canvas();
    fx.pool.run_until(canvas.mount());
    let (changes, _sub) = fx.record(Topic::SelectionChanged);

    fx.editor.select(&[a.as_str()]);
    fx.editor.hover(Some(&b));
    let report = fx.pool.run_until(canvas.on_interaction()).unwrap();
    assert_eq!(report.written, 2);
    assert_eq!(*changes.borrow(), vec![a.clone()]);
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &a, "selected"),
        Some(PropertyValue::Bool(true))
    );
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &b, "hovered"),
        Some(PropertyValue::Bool(true))
    );

    let again = fx.pool.run_until(canvas.on_interaction()).unwrap();
    assert_eq!(again.written, 0);
    assert_eq!(changes.borrow().len(), 1);

    fx.editor.select(&[b.as_str()]);
    fx.editor.hover(None);
    fx.pool.run_until(canvas.on_interaction());
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &a, "selected"),
        Some(PropertyValue::Bool(false))
    );
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &b, "hovered"),
        Some(PropertyValue::Bool(false))
    );
    assert_eq!(changes.borrow().len(), 3);
}

#[test]
fn unmount_during_pending_reconcile_writes_nothing() {
    let mut fx = Fixture::new();
    let a = fx.note(DVec3::ZERO);
    let store = DelayedStore::new(fx.store.clone());
    let canvas = Rc::new(CanvasSync::new(
        store.clone(),
        fx.editor.clone(),
        fx.bus.clone(),
        spawner(&fx.pool),
        fx.space.clone(),
        SyncConfig::default(),
    ));
    assert!(fx.pool.run_until(canvas.mount()));
    let (changes, _sub) = fx.record(Topic::SelectionChanged);
    let writes_before = store.writes().len();

    fx.editor.select(&[a.as_str()]);
    store.hold();
    let task = {
        let canvas = canvas.clone();
        fx.pool
            .spawner()
            .spawn_local_with_handle(async move { canvas.on_interaction().await })
            .unwrap()
    };
    fx.pool.run_until_stalled();
    assert_eq!(store.parked(), 1);

    canvas.unmount();
    store.release();

    assert_eq!(fx.pool.run_until(task), None);
    assert_eq!(store.writes().len(), writes_before);
    assert!(changes.borrow().is_empty());
    assert_eq!(read(&mut fx.pool, fx.store.as_ref(), &a, "selected"), None);
}

#[test]
fn canvas_trashcan_deletes_entities_dropped_on_it() {
    let mut fx = Fixture::new();
    let can = fx.spawn(MovablePayload::Trashcan, DVec3::ZERO);
    let entity = fx.note(DVec3::new(1.0, 0.0, 0.0));
    let canvas = fx.canvas();
    fx.pool.run_until(canvas.mount());
    assert_eq!(canvas.trashcan_ids(), vec![can.clone()]);

    fx.editor.select(&[entity.as_str()]);
    fx.editor.dragging.set(true);
    fx.tick(&canvas);
    fx.editor.move_shape(&entity, DVec2::new(20.0, 0.0));
    fx.editor.dragging.set(false);
    fx.tick(&canvas);

    assert!(!exists(&mut fx.pool, fx.store.as_ref(), &entity));
    fx.tick(&canvas);
    assert!(fx.editor.shape_of(&entity).is_none());
    assert!(fx.editor.shape_of(&can).is_some());
}

#[test]
fn unmount_unlocks_title_and_releases_everything() {
    let mut fx = Fixture::new();
    fx.spawn(MovablePayload::Trashcan, DVec3::ZERO);
    fx.note(DVec3::new(0.5, 0.0, 0.0));
    let canvas = fx.canvas();
    fx.pool.run_until(canvas.mount());
    assert_eq!(fx.bus.subscriber_count(Topic::DragEnd), 1);

    canvas.unmount();

    assert!(fx.editor.shapes.borrow().is_empty());
    assert_eq!(fx.editor.locked_delete_attempts.get(), 0);
    assert_eq!(fx.bus.subscriber_count(Topic::DragEnd), 0);

    fx.editor.dragging.set(true);
    fx.tick(&canvas);
    assert!(fx.editor.shapes.borrow().is_empty());
}

#[test]
fn members_outside_the_boundary_draw_clipped() {
    let mut fx = Fixture::new();
    let inside = fx.note(DVec3::new(0.5, 0.0, 0.0));
    let outside = fx.note(DVec3::new(5.0, 0.0, 0.0));
    let canvas = fx.canvas();
    fx.pool.run_until(canvas.mount());

    assert!(!fx.editor.shape_of(&inside).unwrap().clipped);
    assert!(fx.editor.shape_of(&outside).unwrap().clipped);
}
