use crate::model::movable::props as movable_props;
use crate::model::space::{props as space_props, SPACE_TYPE};
use crate::model::value::{EntityId, PropertyValue};
use crate::store::{EntityHandle, EntityStore, PropertyFilter, StoreError, MOVABLE_CAPABILITY};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TransferResult<T> = Result<T, TransferError>;

#[derive(Debug)]
pub enum TransferError {
    /// The entity to move does not resolve.
    EntityNotFound(EntityId),
    /// The destination does not resolve to a space.
    SpaceNotFound(EntityId),
    Store(StoreError),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntityNotFound(id) => write!(f, "entity not found: {id}"),
            Self::SpaceNotFound(id) => write!(f, "space not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Space references before and after a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub previous: Option<EntityId>,
    pub current: Option<EntityId>,
}

/// Moves `entity_id` into `new_space` (`None` unassigns it).
///
/// Three independent writes: the entity's `space` field, removal from the
/// previous space's list, append to the new space's list. Lists are
/// replaced wholesale and the append is skipped when the id is present, so
/// the entity appears at most once.
///
/// # Errors
/// - `EntityNotFound` / `SpaceNotFound` before any write is issued.
/// - `Store` when a write fails; earlier writes stay applied.
pub async fn move_entity_to_space(
    store: &dyn EntityStore,
    entity_id: &str,
    new_space: Option<&str>,
) -> TransferResult<TransferOutcome> {
    let entity = store
        .resolve(entity_id)
        .await?
        .ok_or_else(|| TransferError::EntityNotFound(entity_id.to_string()))?;
    let new_space = match new_space.filter(|id| !id.is_empty()) {
        Some(id) => Some(resolve_space(store, id).await?),
        None => None,
    };

    let previous = store
        .get_property(&entity, movable_props::SPACE)
        .await?
        .and_then(|value| value.as_text().map(str::to_string))
        .filter(|id| !id.is_empty());
    let current = new_space.as_ref().map(|space| space.id.clone());

    store
        .set_property(
            &entity,
            movable_props::SPACE,
            PropertyValue::reference(current.as_deref()),
        )
        .await?;

    if let Some(previous) = previous.as_deref().filter(|id| Some(*id) != current.as_deref()) {
        unlink(store, previous, entity_id).await?;
    }
    if let Some(space) = &new_space {
        link(store, space, entity_id).await?;
    }

    info!(
        "event=space_transfer module=spatial status=ok entity={} from={} to={}",
        entity_id,
        previous.as_deref().unwrap_or("-"),
        current.as_deref().unwrap_or("-")
    );
    Ok(TransferOutcome { previous, current })
}

/// Re-derives a space's member list from the `space` field of every
/// movable and writes it back when it differs. Returns the derived list in
/// creation order per type.
///
/// # Errors
/// - `SpaceNotFound` when `space_id` is not a space.
pub async fn rebuild_membership(
    store: &dyn EntityStore,
    space_id: &str,
) -> TransferResult<Vec<EntityId>> {
    let space = resolve_space(store, space_id).await?;
    let filter = PropertyFilter::eq(movable_props::SPACE, PropertyValue::reference(Some(space_id)));

    let mut derived = Vec::new();
    for type_tag in store.all_types_implementing(MOVABLE_CAPABILITY).await? {
        derived.extend(store.query_by_type(&type_tag, Some(&filter)).await?);
    }

    let stored = read_members(store, &space).await?;
    if stored != derived {
        store
            .set_property(&space, space_props::MOVABLES, derived.clone().into())
            .await?;
        info!(
            "event=space_membership_rebuild module=spatial status=ok space={} before={} after={}",
            space_id,
            stored.len(),
            derived.len()
        );
    }
    Ok(derived)
}

/// Deletes a movable and unlinks it from its space.
///
/// Returns `false` when the entity was already gone.
pub async fn remove_movable(store: &dyn EntityStore, entity_id: &str) -> TransferResult<bool> {
    let Some(entity) = store.resolve(entity_id).await? else {
        return Ok(false);
    };
    let space = store
        .get_property(&entity, movable_props::SPACE)
        .await?
        .and_then(|value| value.as_text().map(str::to_string))
        .filter(|id| !id.is_empty());

    match store.delete(entity_id).await {
        Ok(()) => {}
        Err(err) if err.is_not_found() => return Ok(false),
        Err(err) => return Err(err.into()),
    }
    if let Some(space) = space {
        unlink(store, &space, entity_id).await?;
    }
    info!(
        "event=movable_remove module=spatial status=ok entity={}",
        entity_id
    );
    Ok(true)
}

async fn resolve_space(store: &dyn EntityStore, space_id: &str) -> TransferResult<EntityHandle> {
    match store.resolve(space_id).await? {
        Some(handle) if handle.type_tag == SPACE_TYPE => Ok(handle),
        _ => Err(TransferError::SpaceNotFound(space_id.to_string())),
    }
}

async fn read_members(store: &dyn EntityStore, space: &EntityHandle) -> TransferResult<Vec<EntityId>> {
    Ok(store
        .get_property(space, space_props::MOVABLES)
        .await?
        .and_then(|value| value.as_id_list().map(<[EntityId]>::to_vec))
        .unwrap_or_default())
}

async fn link(store: &dyn EntityStore, space: &EntityHandle, entity_id: &str) -> TransferResult<()> {
    let mut members = read_members(store, space).await?;
    if members.iter().any(|id| id == entity_id) {
        return Ok(());
    }
    members.push(entity_id.to_string());
    store
        .set_property(space, space_props::MOVABLES, members.into())
        .await?;
    Ok(())
}

/// Removes `entity_id` from a space's list; a vanished space is skipped.
async fn unlink(store: &dyn EntityStore, space_id: &str, entity_id: &str) -> TransferResult<()> {
    let Some(space) = store.resolve(space_id).await? else {
        debug!(
            "event=space_unlink module=spatial status=skip reason=space_gone space={} entity={}",
            space_id, entity_id
        );
        return Ok(());
    };
    let members = read_members(store, &space).await?;
    if !members.iter().any(|id| id == entity_id) {
        return Ok(());
    }
    let remaining: Vec<EntityId> = members.into_iter().filter(|id| id != entity_id).collect();
    match store
        .set_property(&space, space_props::MOVABLES, remaining.into())
        .await
    {
        Ok(()) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}
