//! Store contract shared by the reference store and remote adapters.

use crate::db::DbError;
use crate::model::value::{EntityId, PropertyMap, PropertyType, PropertyValue};
use crate::store::filter::PropertyFilter;
use crate::store::schema::SchemaError;
use futures::future::LocalBoxFuture;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level errors.
///
/// Resolution misses are not errors: `resolve`/`get_property` return `None`.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Schema(SchemaError),
    /// Type tag is not declared by the active schema.
    UnknownType(String),
    /// Property is not declared for the entity's type.
    UnknownProperty { type_tag: String, name: String },
    /// Value does not match the declared property type.
    TypeMismatch {
        name: String,
        expected: PropertyType,
    },
    /// Write targeted an entity that does not exist (anymore).
    NotFound(EntityId),
    /// Persisted data cannot be decoded.
    InvalidData(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::UnknownType(type_tag) => write!(f, "unknown entity type: {type_tag}"),
            Self::UnknownProperty { type_tag, name } => {
                write!(f, "property `{name}` is not declared for type {type_tag}")
            }
            Self::TypeMismatch { name, expected } => write!(
                f,
                "property `{name}` expects a {} value",
                expected.as_str()
            ),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaError> for StoreError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

/// Resolved entity reference bound to one concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub id: EntityId,
    pub type_tag: String,
}

impl EntityHandle {
    pub fn new(id: impl Into<EntityId>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
        }
    }
}

/// Change delivered to watchers after a store write has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Created { id: EntityId, type_tag: String },
    PropertyChanged { id: EntityId, name: String },
    Deleted { id: EntityId },
}

impl StoreChange {
    pub fn entity_id(&self) -> &str {
        match self {
            Self::Created { id, .. } | Self::PropertyChanged { id, .. } | Self::Deleted { id } => {
                id.as_str()
            }
        }
    }
}

pub type ChangeListener = Rc<dyn Fn(&StoreChange)>;
pub type ReloadListener = Rc<dyn Fn()>;

/// Registration token for `watch`/`on_reloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Async contract of the shared property store.
///
/// Every method may suspend on storage or network latency, and completions
/// of independent calls may arrive in any order. Implementations run on a
/// single cooperative thread, hence the non-`Send` futures.
pub trait EntityStore {
    /// Resolves `id` to a typed handle; `Ok(None)` when it does not exist.
    fn resolve<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<EntityHandle>>>;

    /// Reads one property; `Ok(None)` when the entity or property is absent.
    fn get_property<'a>(
        &'a self,
        handle: &'a EntityHandle,
        name: &'a str,
    ) -> LocalBoxFuture<'a, StoreResult<Option<PropertyValue>>>;

    /// Replaces one property value.
    fn set_property<'a>(
        &'a self,
        handle: &'a EntityHandle,
        name: &'a str,
        value: PropertyValue,
    ) -> LocalBoxFuture<'a, StoreResult<()>>;

    /// Creates an entity and returns its generated id.
    fn create<'a>(
        &'a self,
        type_tag: &'a str,
        initial: PropertyMap,
    ) -> LocalBoxFuture<'a, StoreResult<EntityId>>;

    /// Deletes an entity; `NotFound` when it is already gone.
    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, StoreResult<()>>;

    /// Lists ids of one type, in creation order, optionally filtered.
    fn query_by_type<'a>(
        &'a self,
        type_tag: &'a str,
        filter: Option<&'a PropertyFilter>,
    ) -> LocalBoxFuture<'a, StoreResult<Vec<EntityId>>>;

    /// Lists type tags declaring `capability`.
    fn all_types_implementing<'a>(
        &'a self,
        capability: &'a str,
    ) -> LocalBoxFuture<'a, StoreResult<Vec<String>>>;

    /// Watches one entity (`Some(id)`) or every entity (`None`).
    fn watch(&self, id: Option<&str>, listener: ChangeListener) -> ListenerId;

    /// Registers a listener for structural schema reloads.
    fn on_reloaded(&self, listener: ReloadListener) -> ListenerId;

    /// Releases a `watch` or `on_reloaded` registration. Unknown ids are ignored.
    fn remove_listener(&self, listener: ListenerId);
}
