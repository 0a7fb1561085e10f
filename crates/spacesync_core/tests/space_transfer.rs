mod common;

use common::{members, read, write};
use futures::executor::LocalPool;
use glam::DVec3;
use spacesync_core::{
    CreateSpaceRequest, EntityStore, ManagerRegistry, MovablePayload, PropertyValue,
    SpaceService, SpaceServiceError, SpawnMovableRequest, SqliteEntityStore,
};
use std::rc::Rc;

struct Fixture {
    pool: LocalPool,
    store: Rc<SqliteEntityStore>,
    service: SpaceService,
}

fn fixture() -> Fixture {
    let store = common::store();
    let managers = Rc::new(ManagerRegistry::new(store.clone()));
    Fixture {
        pool: LocalPool::new(),
        service: SpaceService::new(store.clone(), managers),
        store,
    }
}

fn space(fx: &mut Fixture, name: &str) -> String {
    let request = CreateSpaceRequest::new(name, DVec3::ZERO, DVec3::splat(2.0));
    fx.pool.run_until(fx.service.create_space(&request)).unwrap()
}

fn note(fx: &mut Fixture, space_id: Option<&str>) -> String {
    let mut request = SpawnMovableRequest::new(
        MovablePayload::Note {
            text: "todo".to_string(),
        },
        DVec3::ZERO,
    );
    request.space_id = space_id.map(str::to_string);
    fx.pool.run_until(fx.service.spawn_movable(&request)).unwrap()
}

#[test]
fn moving_between_spaces_updates_both_lists() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    let b = space(&mut fx, "B");
    let entity = note(&mut fx, Some(&a));
    assert_eq!(members(&mut fx.pool, fx.store.as_ref(), &a), vec![entity.clone()]);

    let outcome = fx
        .pool
        .run_until(fx.service.move_entity_to_space(&entity, Some(&b)))
        .unwrap();

    assert_eq!(outcome.previous, Some(a.clone()));
    assert_eq!(outcome.current, Some(b.clone()));
    assert!(members(&mut fx.pool, fx.store.as_ref(), &a).is_empty());
    assert_eq!(members(&mut fx.pool, fx.store.as_ref(), &b), vec![entity.clone()]);
    assert_eq!(
        read(&mut fx.pool, fx.store.as_ref(), &entity, "space"),
        Some(PropertyValue::Text(b))
    );
}

#[test]
fn moving_twice_into_same_space_keeps_one_entry() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    let entity = note(&mut fx, None);

    for _ in 0..2 {
        fx.pool
            .run_until(fx.service.move_entity_to_space(&entity, Some(&a)))
            .unwrap();
    }
    assert_eq!(members(&mut fx.pool, fx.store.as_ref(), &a), vec![entity]);
}

#[test]
fn unassigning_clears_space_and_membership() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    let entity = note(&mut fx, Some(&a));

    fx.pool
        .run_until(fx.service.move_entity_to_space(&entity, None))
        .unwrap();

    assert!(members(&mut fx.pool, fx.store.as_ref(), &a).is_empty());
    assert_eq!(read(&mut fx.pool, fx.store.as_ref(), &entity, "space"), None);
}

#[test]
fn moving_into_missing_space_fails_before_writing() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    let entity = note(&mut fx, Some(&a));

    let err = fx
        .pool
        .run_until(fx.service.move_entity_to_space(&entity, Some("missing")))
        .unwrap_err();

    assert!(matches!(err, SpaceServiceError::SpaceNotFound(_)));
    assert_eq!(members(&mut fx.pool, fx.store.as_ref(), &a), vec![entity]);
}

#[test]
fn rebuild_rederives_membership_from_space_fields() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    let linked = note(&mut fx, Some(&a));
    let orphan = note(&mut fx, None);

    write(
        &mut fx.pool,
        fx.store.as_ref(),
        &orphan,
        "space",
        PropertyValue::reference(Some(&a)),
    );
    write(
        &mut fx.pool,
        fx.store.as_ref(),
        &a,
        "movables",
        vec!["ghost".to_string(), linked.clone()].into(),
    );

    let derived = fx.pool.run_until(fx.service.rebuild_membership(&a)).unwrap();

    assert_eq!(derived, vec![linked.clone(), orphan.clone()]);
    assert_eq!(members(&mut fx.pool, fx.store.as_ref(), &a), vec![linked, orphan]);
}

#[test]
fn removing_movable_is_idempotent() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    let entity = note(&mut fx, Some(&a));

    assert!(fx.pool.run_until(fx.service.remove_movable(&entity)).unwrap());
    assert!(!fx.pool.run_until(fx.service.remove_movable(&entity)).unwrap());
    assert!(members(&mut fx.pool, fx.store.as_ref(), &a).is_empty());
    assert!(fx.pool.run_until(fx.store.resolve(&entity)).unwrap().is_none());
}

#[test]
fn current_space_round_trips_and_forgets_deleted_spaces() {
    let mut fx = fixture();
    let a = space(&mut fx, "A");
    assert_eq!(fx.pool.run_until(fx.service.current_space()).unwrap(), None);

    fx.pool
        .run_until(fx.service.set_current_space(Some(&a)))
        .unwrap();
    assert_eq!(
        fx.pool.run_until(fx.service.current_space()).unwrap(),
        Some(a.clone())
    );

    fx.pool.run_until(fx.store.delete(&a)).unwrap();
    assert_eq!(fx.pool.run_until(fx.service.current_space()).unwrap(), None);
}

#[test]
fn blank_names_are_rejected() {
    let mut fx = fixture();
    let request = CreateSpaceRequest::new("   ", DVec3::ZERO, DVec3::ONE);
    let err = fx.pool.run_until(fx.service.create_space(&request)).unwrap_err();
    assert!(matches!(err, SpaceServiceError::InvalidName));

    let a = space(&mut fx, "A");
    fx.pool
        .run_until(fx.service.rename_space(&a, "  Lobby "))
        .unwrap();
    let spaces = fx.pool.run_until(fx.service.list_spaces()).unwrap();
    assert_eq!(spaces.len(), 1);
    assert_eq!(spaces[0].name, "Lobby");
}
