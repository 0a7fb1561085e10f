//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `spacesync_core` linkage.
//! - Run a short scripted session against an in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use futures::executor::block_on;
use glam::DVec3;
use spacesync_core::{
    CreateSpaceRequest, EntityStore, ManagerRegistry, MovablePayload, SpaceService,
    SpaceServiceError, SpawnMovableRequest, SqliteEntityStore,
};
use std::process::ExitCode;
use std::rc::Rc;

fn main() -> ExitCode {
    println!("spacesync_core ping={}", spacesync_core::ping());
    println!("spacesync_core version={}", spacesync_core::core_version());

    match block_on(demo()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("spacesync demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn demo() -> Result<(), SpaceServiceError> {
    let store: Rc<dyn EntityStore> = Rc::new(SqliteEntityStore::open_in_memory()?);
    let managers = Rc::new(ManagerRegistry::new(Rc::clone(&store)));
    managers.ensure_all().await?;
    let service = SpaceService::new(store, managers);

    let desk = service
        .create_space(&CreateSpaceRequest::new("Desk", DVec3::ZERO, DVec3::splat(2.0)))
        .await?;
    let wall = service
        .create_space(&CreateSpaceRequest::new(
            "Wall",
            DVec3::new(4.0, 0.0, 0.0),
            DVec3::splat(3.0),
        ))
        .await?;

    let note = service
        .spawn_movable(
            &SpawnMovableRequest::new(
                MovablePayload::Note {
                    text: "hello".to_string(),
                },
                DVec3::new(0.5, 0.0, 0.5),
            )
            .in_space(desk.clone()),
        )
        .await?;
    service
        .spawn_movable(
            &SpawnMovableRequest::new(MovablePayload::Trashcan, DVec3::new(1.5, 0.0, 1.5))
                .in_space(desk.clone()),
        )
        .await?;
    print_counts(&service).await?;

    service.move_entity_to_space(&note, Some(&wall)).await?;
    println!("moved note={note} to space={wall}");
    print_counts(&service).await?;

    service.remove_movable(&note).await?;
    println!("removed note={note}");
    print_counts(&service).await
}

async fn print_counts(service: &SpaceService) -> Result<(), SpaceServiceError> {
    for space in service.list_spaces().await? {
        println!("space name={} members={}", space.name, space.movables.len());
    }
    Ok(())
}
