//! Space use-case service.
//!
//! # Responsibility
//! - Provide create/rename/list entry points for spaces.
//! - Spawn, move and remove movables with membership kept in step.
//! - Read and write the current space on the space manager singleton.
//!
//! # Invariants
//! - Space names are non-blank after trim.
//! - A spawned movable is linked into its space through the same transfer
//!   path every other move uses.

use crate::model::movable::{props as movable_props, MovableKind, MovablePayload};
use crate::model::space::{props as space_props, Boundary, ClippingMode, Space, SPACE_TYPE};
use crate::model::value::{EntityId, PropertyMap, PropertyValue};
use crate::projection::ProjectionPreset;
use crate::registry::{ManagerRegistry, SPACE_MANAGER_TYPE};
use crate::spatial::transfer;
use crate::spatial::{TransferError, TransferOutcome};
use crate::store::access;
use crate::store::{EntityHandle, EntityStore, StoreError};
use glam::DVec3;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug)]
pub enum SpaceServiceError {
    /// Name is blank after trim.
    InvalidName,
    /// Boundary or transform has non-finite components or negative size.
    InvalidGeometry,
    SpaceNotFound(EntityId),
    EntityNotFound(EntityId),
    Transfer(TransferError),
    Store(StoreError),
}

impl Display for SpaceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "space name cannot be blank"),
            Self::InvalidGeometry => write!(f, "geometry must be finite with non-negative size"),
            Self::SpaceNotFound(id) => write!(f, "space not found: {id}"),
            Self::EntityNotFound(id) => write!(f, "entity not found: {id}"),
            Self::Transfer(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SpaceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transfer(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SpaceServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TransferError> for SpaceServiceError {
    fn from(value: TransferError) -> Self {
        match value {
            TransferError::SpaceNotFound(id) => Self::SpaceNotFound(id),
            TransferError::EntityNotFound(id) => Self::EntityNotFound(id),
            other => Self::Transfer(other),
        }
    }
}

pub type SpaceServiceResult<T> = Result<T, SpaceServiceError>;

/// Request model for creating a space.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSpaceRequest {
    pub name: String,
    pub boundary_origin: DVec3,
    pub boundary_size: DVec3,
    pub projection: ProjectionPreset,
    pub show_boundary: bool,
    /// `None` leaves the mode unset so the configured default applies.
    pub clipping: Option<ClippingMode>,
}

impl CreateSpaceRequest {
    pub fn new(name: impl Into<String>, boundary_origin: DVec3, boundary_size: DVec3) -> Self {
        Self {
            name: name.into(),
            boundary_origin,
            boundary_size,
            projection: ProjectionPreset::default(),
            show_boundary: true,
            clipping: None,
        }
    }
}

/// Request model for spawning a movable.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnMovableRequest {
    pub payload: MovablePayload,
    pub position: DVec3,
    pub rotation: DVec3,
    pub space_id: Option<EntityId>,
}

impl SpawnMovableRequest {
    pub fn new(payload: MovablePayload, position: DVec3) -> Self {
        Self {
            payload,
            position,
            rotation: DVec3::ZERO,
            space_id: None,
        }
    }

    pub fn in_space(mut self, space_id: impl Into<EntityId>) -> Self {
        self.space_id = Some(space_id.into());
        self
    }
}

pub struct SpaceService {
    store: Rc<dyn EntityStore>,
    managers: Rc<ManagerRegistry>,
}

impl SpaceService {
    pub fn new(store: Rc<dyn EntityStore>, managers: Rc<ManagerRegistry>) -> Self {
        Self { store, managers }
    }

    pub async fn create_space(&self, request: &CreateSpaceRequest) -> SpaceServiceResult<EntityId> {
        let name = normalize_name(&request.name)?;
        let boundary = Boundary::new(request.boundary_origin, request.boundary_size)
            .ok_or(SpaceServiceError::InvalidGeometry)?;

        let mut initial = PropertyMap::new();
        initial.insert(space_props::NAME.to_string(), name.into());
        initial.insert(space_props::MOVABLES.to_string(), Vec::<EntityId>::new().into());
        initial.insert(space_props::BOUNDARY_ORIGIN.to_string(), boundary.origin.into());
        initial.insert(space_props::BOUNDARY_SIZE.to_string(), boundary.size.into());
        initial.insert(
            space_props::PROJECTION.to_string(),
            request.projection.as_str().into(),
        );
        initial.insert(
            space_props::SHOW_BOUNDARY.to_string(),
            request.show_boundary.into(),
        );
        if let Some(mode) = request.clipping {
            initial.insert(space_props::CLIPPING_MODE.to_string(), mode.as_str().into());
        }

        let id = self.store.create(SPACE_TYPE, initial).await?;
        info!("event=space_create module=service status=ok space={}", id);
        Ok(id)
    }

    pub async fn rename_space(&self, space_id: &str, name: &str) -> SpaceServiceResult<()> {
        let name = normalize_name(name)?;
        let space = self.space_handle(space_id).await?;
        self.store
            .set_property(&space, space_props::NAME, name.into())
            .await?;
        Ok(())
    }

    /// Every space in creation order.
    pub async fn list_spaces(&self) -> SpaceServiceResult<Vec<Space>> {
        let ids = self.store.query_by_type(SPACE_TYPE, None).await?;
        let mut spaces = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(space) = access::load_space(self.store.as_ref(), &id).await {
                spaces.push(space);
            }
        }
        Ok(spaces)
    }

    /// Creates a movable and links it into `request.space_id` when given.
    pub async fn spawn_movable(&self, request: &SpawnMovableRequest) -> SpaceServiceResult<EntityId> {
        if !request.position.is_finite() || !request.rotation.is_finite() {
            return Err(SpaceServiceError::InvalidGeometry);
        }
        if let Some(space_id) = &request.space_id {
            self.space_handle(space_id).await?;
        }

        let kind = request.payload.kind();
        let mut initial = PropertyMap::new();
        initial.insert(movable_props::POSITION.to_string(), request.position.into());
        initial.insert(movable_props::ROTATION.to_string(), request.rotation.into());
        match &request.payload {
            MovablePayload::Note { text } => {
                initial.insert(movable_props::TEXT.to_string(), text.as_str().into());
            }
            MovablePayload::Image { url } | MovablePayload::Model { url } => {
                initial.insert(movable_props::URL.to_string(), url.as_str().into());
            }
            MovablePayload::ScreenShare {
                client_id: Some(client_id),
            } => {
                initial.insert(movable_props::CLIENT_ID.to_string(), client_id.as_str().into());
            }
            MovablePayload::ScreenShare { client_id: None } => {}
            MovablePayload::Trashcan => {}
        }

        let id = self.store.create(kind.as_str(), initial).await?;
        if let Some(space_id) = &request.space_id {
            transfer::move_entity_to_space(self.store.as_ref(), &id, Some(space_id)).await?;
        }
        info!(
            "event=movable_spawn module=service status=ok entity={} kind={}",
            id,
            kind.as_str()
        );
        Ok(id)
    }

    pub async fn move_entity_to_space(
        &self,
        entity_id: &str,
        space_id: Option<&str>,
    ) -> SpaceServiceResult<TransferOutcome> {
        Ok(transfer::move_entity_to_space(self.store.as_ref(), entity_id, space_id).await?)
    }

    /// Deletes a movable and unlinks it; `false` when it was already gone.
    pub async fn remove_movable(&self, entity_id: &str) -> SpaceServiceResult<bool> {
        Ok(transfer::remove_movable(self.store.as_ref(), entity_id).await?)
    }

    pub async fn rebuild_membership(&self, space_id: &str) -> SpaceServiceResult<Vec<EntityId>> {
        Ok(transfer::rebuild_membership(self.store.as_ref(), space_id).await?)
    }

    /// Space selected on the space manager; `None` when unset or deleted.
    pub async fn current_space(&self) -> SpaceServiceResult<Option<EntityId>> {
        let manager = self.manager_handle().await?;
        let Some(space_id) =
            access::read_reference(self.store.as_ref(), &manager, space_props::CURRENT_SPACE).await
        else {
            return Ok(None);
        };
        match self.store.resolve(&space_id).await? {
            Some(handle) if handle.type_tag == SPACE_TYPE => Ok(Some(space_id)),
            _ => Ok(None),
        }
    }

    pub async fn set_current_space(&self, space_id: Option<&str>) -> SpaceServiceResult<()> {
        if let Some(space_id) = space_id {
            self.space_handle(space_id).await?;
        }
        let manager = self.manager_handle().await?;
        self.store
            .set_property(
                &manager,
                space_props::CURRENT_SPACE,
                PropertyValue::reference(space_id),
            )
            .await?;
        Ok(())
    }

    /// Members of `space_id` that resolve to a movable, with their kinds.
    pub async fn member_kinds(&self, space_id: &str) -> SpaceServiceResult<Vec<(EntityId, MovableKind)>> {
        let space = access::load_space(self.store.as_ref(), space_id)
            .await
            .ok_or_else(|| SpaceServiceError::SpaceNotFound(space_id.to_string()))?;
        let mut members = Vec::with_capacity(space.movables.len());
        for id in space.movables {
            if let Some(handle) = self.store.resolve(&id).await? {
                if let Some(kind) = MovableKind::parse(&handle.type_tag) {
                    members.push((id, kind));
                }
            }
        }
        Ok(members)
    }

    async fn space_handle(&self, space_id: &str) -> SpaceServiceResult<EntityHandle> {
        match self.store.resolve(space_id).await? {
            Some(handle) if handle.type_tag == SPACE_TYPE => Ok(handle),
            _ => Err(SpaceServiceError::SpaceNotFound(space_id.to_string())),
        }
    }

    async fn manager_handle(&self) -> SpaceServiceResult<EntityHandle> {
        let id = match self.managers.manager_id(SPACE_MANAGER_TYPE) {
            Some(id) => id,
            None => self.managers.ensure_exists(SPACE_MANAGER_TYPE).await?,
        };
        match self.store.resolve(&id).await? {
            Some(handle) => Ok(handle),
            None => {
                let id = self.managers.ensure_exists(SPACE_MANAGER_TYPE).await?;
                self.store
                    .resolve(&id)
                    .await?
                    .ok_or_else(|| SpaceServiceError::EntityNotFound(id.clone()))
            }
        }
    }
}

fn normalize_name(value: &str) -> SpaceServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SpaceServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}
