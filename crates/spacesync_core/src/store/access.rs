//! Fail-soft accessors over `EntityStore`.
//!
//! Rendering and interaction code races entity creation and deletion, so
//! every helper here turns misses, store errors and malformed values into
//! `None`/`false`/empty and logs instead of returning an error.

use crate::model::movable::{props as movable_props, Movable, MovableKind, MovablePayload};
use crate::model::space::{props as space_props, Boundary, ClippingMode, Space, SPACE_TYPE};
use crate::model::value::{EntityId, PropertyValue};
use crate::projection::ProjectionPreset;
use crate::store::adapter::{EntityHandle, EntityStore};
use crate::store::schema::MOVABLE_CAPABILITY;
use glam::DVec3;
use log::{debug, warn};

/// Resolves `id`, treating store errors as misses.
pub async fn resolve(store: &dyn EntityStore, id: &str) -> Option<EntityHandle> {
    if id.is_empty() {
        return None;
    }
    match store.resolve(id).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(
                "event=store_resolve module=access status=error entity={} error={}",
                id, err
            );
            None
        }
    }
}

pub async fn read(store: &dyn EntityStore, handle: &EntityHandle, name: &str) -> Option<PropertyValue> {
    match store.get_property(handle, name).await {
        Ok(value) => value,
        Err(err) => {
            warn!(
                "event=store_read module=access status=error entity={} name={} error={}",
                handle.id, name, err
            );
            None
        }
    }
}

pub async fn read_bool(store: &dyn EntityStore, handle: &EntityHandle, name: &str) -> bool {
    read(store, handle, name)
        .await
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

pub async fn read_vec3(store: &dyn EntityStore, handle: &EntityHandle, name: &str) -> Option<DVec3> {
    let value = read(store, handle, name).await?;
    let vector = value.as_vec3();
    if vector.is_none() {
        debug!(
            "event=store_read module=access status=skip reason=malformed_vec3 entity={} name={}",
            handle.id, name
        );
    }
    vector
}

pub async fn read_text(store: &dyn EntityStore, handle: &EntityHandle, name: &str) -> Option<String> {
    read(store, handle, name)
        .await
        .and_then(|value| value.as_text().map(str::to_string))
}

/// Reads an entity reference; empty text counts as unassigned.
pub async fn read_reference(
    store: &dyn EntityStore,
    handle: &EntityHandle,
    name: &str,
) -> Option<EntityId> {
    read_text(store, handle, name)
        .await
        .filter(|value| !value.is_empty())
}

pub async fn read_id_list(store: &dyn EntityStore, handle: &EntityHandle, name: &str) -> Vec<EntityId> {
    read(store, handle, name)
        .await
        .and_then(|value| value.as_id_list().map(<[EntityId]>::to_vec))
        .unwrap_or_default()
}

/// Writes one property; returns whether the store accepted the write.
pub async fn write(
    store: &dyn EntityStore,
    handle: &EntityHandle,
    name: &str,
    value: PropertyValue,
) -> bool {
    match store.set_property(handle, name, value).await {
        Ok(()) => true,
        Err(err) if err.is_not_found() => {
            debug!(
                "event=store_write module=access status=skip reason=entity_gone entity={} name={}",
                handle.id, name
            );
            false
        }
        Err(err) => {
            warn!(
                "event=store_write module=access status=error entity={} name={} error={}",
                handle.id, name, err
            );
            false
        }
    }
}

/// Every movable id across all types implementing the movable capability.
pub async fn movable_ids(store: &dyn EntityStore) -> Vec<EntityId> {
    let types = match store.all_types_implementing(MOVABLE_CAPABILITY).await {
        Ok(types) => types,
        Err(err) => {
            warn!(
                "event=store_query module=access status=error capability={} error={}",
                MOVABLE_CAPABILITY, err
            );
            return Vec::new();
        }
    };

    let mut ids = Vec::new();
    for type_tag in types {
        match store.query_by_type(&type_tag, None).await {
            Ok(mut found) => ids.append(&mut found),
            Err(err) => warn!(
                "event=store_query module=access status=error type={} error={}",
                type_tag, err
            ),
        }
    }
    ids
}

/// Loads a movable snapshot; `None` when it is missing or not a movable.
pub async fn load_movable(store: &dyn EntityStore, id: &str) -> Option<Movable> {
    let handle = resolve(store, id).await?;
    load_movable_with(store, &handle).await
}

pub async fn load_movable_with(store: &dyn EntityStore, handle: &EntityHandle) -> Option<Movable> {
    let kind = MovableKind::parse(&handle.type_tag)?;
    let payload = match kind {
        MovableKind::Note => MovablePayload::Note {
            text: read_text(store, handle, movable_props::TEXT)
                .await
                .unwrap_or_default(),
        },
        MovableKind::Image => MovablePayload::Image {
            url: read_text(store, handle, movable_props::URL)
                .await
                .unwrap_or_default(),
        },
        MovableKind::Model => MovablePayload::Model {
            url: read_text(store, handle, movable_props::URL)
                .await
                .unwrap_or_default(),
        },
        MovableKind::Trashcan => MovablePayload::Trashcan,
        MovableKind::ScreenShare => MovablePayload::ScreenShare {
            client_id: read_text(store, handle, movable_props::CLIENT_ID).await,
        },
    };

    Some(Movable {
        id: handle.id.clone(),
        payload,
        position: read_vec3(store, handle, movable_props::POSITION).await,
        rotation: read_vec3(store, handle, movable_props::ROTATION).await,
        selected: read_bool(store, handle, movable_props::SELECTED).await,
        hovered: read_bool(store, handle, movable_props::HOVERED).await,
        being_dragged: read_bool(store, handle, movable_props::BEING_DRAGGED).await,
        space: read_reference(store, handle, movable_props::SPACE).await,
    })
}

/// Loads a space snapshot; `None` when it is missing or not a space.
pub async fn load_space(store: &dyn EntityStore, id: &str) -> Option<Space> {
    let handle = resolve(store, id).await?;
    if handle.type_tag != SPACE_TYPE {
        debug!(
            "event=space_load module=access status=skip reason=not_a_space entity={} type={}",
            id, handle.type_tag
        );
        return None;
    }

    let mut movables = read_id_list(store, &handle, space_props::MOVABLES).await;
    dedup_keep_order(&mut movables);

    let origin = read_vec3(store, &handle, space_props::BOUNDARY_ORIGIN).await;
    let size = read_vec3(store, &handle, space_props::BOUNDARY_SIZE).await;
    let boundary = origin
        .zip(size)
        .and_then(|(origin, size)| Boundary::new(origin, size));

    let projection = read_text(store, &handle, space_props::PROJECTION)
        .await
        .and_then(|value| ProjectionPreset::parse(&value))
        .unwrap_or_default();
    let clipping = read_text(store, &handle, space_props::CLIPPING_MODE)
        .await
        .and_then(|value| ClippingMode::parse(&value));

    Some(Space {
        id: handle.id.clone(),
        name: read_text(store, &handle, space_props::NAME)
            .await
            .unwrap_or_default(),
        movables,
        boundary,
        projection,
        show_boundary: read_bool(store, &handle, space_props::SHOW_BOUNDARY).await,
        clipping,
    })
}

fn dedup_keep_order(ids: &mut Vec<EntityId>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}
