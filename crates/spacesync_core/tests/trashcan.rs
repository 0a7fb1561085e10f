mod common;

use common::{exists, members, spawner};
use futures::executor::LocalPool;
use glam::DVec3;
use spacesync_core::spatial::{ProximityMetric, TrashcanWatcher};
use spacesync_core::{
    CreateSpaceRequest, EventBus, InteractionEvent, ManagerRegistry, MovablePayload,
    SpaceService, SpawnMovableRequest, SqliteEntityStore, Topic, DEFAULT_TRASH_DISTANCE,
};
use std::rc::Rc;

struct Fixture {
    pool: LocalPool,
    store: Rc<SqliteEntityStore>,
    service: SpaceService,
    bus: EventBus,
    space: String,
}

fn fixture() -> Fixture {
    let store = common::store();
    let service = SpaceService::new(store.clone(), Rc::new(ManagerRegistry::new(store.clone())));
    let mut pool = LocalPool::new();
    let request = CreateSpaceRequest::new("Room", DVec3::ZERO, DVec3::splat(4.0));
    let space = pool.run_until(service.create_space(&request)).unwrap();
    Fixture {
        pool,
        store,
        service,
        bus: EventBus::new(),
        space,
    }
}

fn spawn(fx: &mut Fixture, payload: MovablePayload, at: DVec3) -> String {
    let request = SpawnMovableRequest::new(payload, at).in_space(fx.space.clone());
    fx.pool.run_until(fx.service.spawn_movable(&request)).unwrap()
}

fn note(fx: &mut Fixture, at: DVec3) -> String {
    spawn(
        fx,
        MovablePayload::Note {
            text: String::new(),
        },
        at,
    )
}

fn watch(fx: &Fixture, trashcan: &str) -> TrashcanWatcher {
    TrashcanWatcher::attach(
        &fx.bus,
        fx.store.clone(),
        spawner(&fx.pool),
        trashcan,
        ProximityMetric::World,
        DEFAULT_TRASH_DISTANCE,
    )
}

fn drop_on(fx: &mut Fixture, target: &str) {
    fx.bus
        .publish(Topic::DragEnd, &InteractionEvent::new(target));
    fx.pool.run_until_stalled();
}

#[test]
fn drop_within_range_deletes_and_unlinks() {
    let mut fx = fixture();
    let can = spawn(&mut fx, MovablePayload::Trashcan, DVec3::ZERO);
    let _watcher = watch(&fx, &can);
    let entity = note(&mut fx, DVec3::new(0.1, 0.0, 0.0));

    drop_on(&mut fx, &entity);

    assert!(!exists(&mut fx.pool, fx.store.as_ref(), &entity));
    let space = fx.space.clone();
    assert_eq!(members(&mut fx.pool, fx.store.as_ref(), &space), vec![can]);
}

#[test]
fn drop_out_of_range_survives() {
    let mut fx = fixture();
    let can = spawn(&mut fx, MovablePayload::Trashcan, DVec3::ZERO);
    let _watcher = watch(&fx, &can);
    let entity = note(&mut fx, DVec3::new(0.5, 0.0, 0.0));

    drop_on(&mut fx, &entity);

    assert!(exists(&mut fx.pool, fx.store.as_ref(), &entity));
}

#[test]
fn trashcan_never_deletes_itself() {
    let mut fx = fixture();
    let can = spawn(&mut fx, MovablePayload::Trashcan, DVec3::ZERO);
    let _watcher = watch(&fx, &can);

    drop_on(&mut fx, &can);

    assert!(exists(&mut fx.pool, fx.store.as_ref(), &can));
}

#[test]
fn every_trashcan_evaluates_the_same_drop() {
    let mut fx = fixture();
    let far = spawn(&mut fx, MovablePayload::Trashcan, DVec3::new(3.0, 0.0, 0.0));
    let near = spawn(&mut fx, MovablePayload::Trashcan, DVec3::ZERO);
    let _far_watcher = watch(&fx, &far);
    let _near_watcher = watch(&fx, &near);
    let entity = note(&mut fx, DVec3::new(0.0, 0.0, 0.15));

    drop_on(&mut fx, &entity);

    assert!(!exists(&mut fx.pool, fx.store.as_ref(), &entity));
    assert!(exists(&mut fx.pool, fx.store.as_ref(), &far));
    assert!(exists(&mut fx.pool, fx.store.as_ref(), &near));
}

#[test]
fn detached_watcher_stops_deleting() {
    let mut fx = fixture();
    let can = spawn(&mut fx, MovablePayload::Trashcan, DVec3::ZERO);
    let watcher = watch(&fx, &can);
    let entity = note(&mut fx, DVec3::new(0.1, 0.0, 0.0));

    watcher.detach();
    assert_eq!(fx.bus.subscriber_count(Topic::DragEnd), 0);
    drop_on(&mut fx, &entity);

    assert!(exists(&mut fx.pool, fx.store.as_ref(), &entity));
}

#[test]
fn dropping_an_already_deleted_entity_is_ignored() {
    let mut fx = fixture();
    let can = spawn(&mut fx, MovablePayload::Trashcan, DVec3::ZERO);
    let _watcher = watch(&fx, &can);

    drop_on(&mut fx, "gone");

    assert!(exists(&mut fx.pool, fx.store.as_ref(), &can));
}
