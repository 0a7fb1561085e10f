//! SQLite-backed reference implementation of `EntityStore`.
//!
//! # Responsibility
//! - Persist entities as typed property bags behind the async contract.
//! - Enforce the active schema on every write.
//! - Deliver change and reload notifications after writes are applied.
//!
//! # Invariants
//! - Writing `null` removes the property row; reads then return `None`.
//! - Query results follow creation order (`seq ASC`).
//! - Listeners are invoked after the write commits, never while a borrow of
//!   internal state is held.

use crate::db::migrations::ensure_current;
use crate::db::{open_db, open_db_in_memory};
use crate::model::value::{EntityId, PropertyMap, PropertyValue};
use crate::store::adapter::{
    ChangeListener, EntityHandle, EntityStore, ListenerId, ReloadListener, StoreChange,
    StoreError, StoreResult,
};
use crate::store::filter::PropertyFilter;
use crate::store::listeners::ListenerRegistry;
use crate::store::schema::SchemaRegistry;
use futures::future::{FutureExt, LocalBoxFuture};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::path::Path;
use uuid::Uuid;

/// Local property store over one SQLite connection.
pub struct SqliteEntityStore {
    conn: Connection,
    schema: RefCell<SchemaRegistry>,
    listeners: ListenerRegistry,
}

impl SqliteEntityStore {
    /// Wraps an already migrated connection.
    ///
    /// # Errors
    /// - `Db(NotMigrated)` / `Db(SchemaTooNew)` when the connection is not at
    ///   the schema version this build writes.
    pub fn try_new(conn: Connection, schema: SchemaRegistry) -> StoreResult<Self> {
        ensure_current(&conn)?;
        Ok(Self {
            conn,
            schema: RefCell::new(schema),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Opens a file-backed store with the default schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?, SchemaRegistry::with_defaults())
    }

    /// Opens an in-memory store with the default schema.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?, SchemaRegistry::with_defaults())
    }

    /// Returns a copy of the active schema.
    pub fn schema(&self) -> SchemaRegistry {
        self.schema.borrow().clone()
    }

    /// Swaps the active schema and raises `reloaded`.
    pub fn reload_schema(&self, schema: SchemaRegistry) {
        let type_count = schema.len();
        *self.schema.borrow_mut() = schema;
        info!(
            "event=store_schema_reload module=store status=ok type_count={}",
            type_count
        );
        self.listeners.notify_reloaded();
    }

    /// Number of active listener registrations.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn resolve_now(&self, id: &str) -> StoreResult<Option<EntityHandle>> {
        let type_tag = self
            .conn
            .query_row(
                "SELECT type_tag FROM entities WHERE id = ?1;",
                [id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(type_tag.map(|type_tag| EntityHandle::new(id, type_tag)))
    }

    fn get_now(&self, handle: &EntityHandle, name: &str) -> StoreResult<Option<PropertyValue>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value_json FROM entity_properties WHERE entity_id = ?1 AND name = ?2;",
                params![handle.id, name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        raw.map(|json| decode_value(&json, &handle.id, name))
            .transpose()
    }

    fn set_now(&self, handle: &EntityHandle, name: &str, value: PropertyValue) -> StoreResult<()> {
        self.check_property(&handle.type_tag, name, &value)?;

        let tx = self.conn.unchecked_transaction()?;
        let touched = tx.execute(
            "UPDATE entities
             SET updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE id = ?1;",
            [handle.id.as_str()],
        )?;
        if touched == 0 {
            return Err(StoreError::NotFound(handle.id.clone()));
        }
        write_property(&tx, &handle.id, name, &value)?;
        tx.commit()?;

        debug!(
            "event=store_write module=store status=ok op=set_property entity={} name={}",
            handle.id, name
        );
        self.listeners.notify_change(&StoreChange::PropertyChanged {
            id: handle.id.clone(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn create_now(&self, type_tag: &str, initial: PropertyMap) -> StoreResult<EntityId> {
        if self.schema.borrow().get(type_tag).is_none() {
            return Err(StoreError::UnknownType(type_tag.to_string()));
        }
        for (name, value) in &initial {
            self.check_property(type_tag, name, value)?;
        }

        let id = Uuid::new_v4().to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO entities (id, type_tag, seq)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM entities));",
            params![id, type_tag],
        )?;
        for (name, value) in &initial {
            write_property(&tx, &id, name, value)?;
        }
        tx.commit()?;

        debug!(
            "event=store_write module=store status=ok op=create entity={} type={}",
            id, type_tag
        );
        self.listeners.notify_change(&StoreChange::Created {
            id: id.clone(),
            type_tag: type_tag.to_string(),
        });
        Ok(id)
    }

    fn delete_now(&self, id: &str) -> StoreResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM entities WHERE id = ?1;", [id])?;
        if removed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(
            "event=store_write module=store status=ok op=delete entity={}",
            id
        );
        self.listeners
            .notify_change(&StoreChange::Deleted { id: id.to_string() });
        Ok(())
    }

    fn query_now(
        &self,
        type_tag: &str,
        filter: Option<&PropertyFilter>,
    ) -> StoreResult<Vec<EntityId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM entities WHERE type_tag = ?1 ORDER BY seq ASC, id ASC;")?;
        let ids = stmt
            .query_map([type_tag], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let Some(filter) = filter else {
            return Ok(ids);
        };

        let mut matching = Vec::with_capacity(ids.len());
        for id in ids {
            if filter.matches(&self.load_properties(&id)?) {
                matching.push(id);
            }
        }
        Ok(matching)
    }

    fn load_properties(&self, id: &str) -> StoreResult<PropertyMap> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, value_json FROM entity_properties WHERE entity_id = ?1;")?;
        let mut rows = stmt.query([id])?;
        let mut properties = PropertyMap::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let json: String = row.get(1)?;
            let value = decode_value(&json, id, &name)?;
            properties.insert(name, value);
        }
        Ok(properties)
    }

    fn check_property(&self, type_tag: &str, name: &str, value: &PropertyValue) -> StoreResult<()> {
        let schema = self.schema.borrow();
        if schema.get(type_tag).is_none() {
            return Err(StoreError::UnknownType(type_tag.to_string()));
        }
        let declared =
            schema
                .property_type(type_tag, name)
                .ok_or_else(|| StoreError::UnknownProperty {
                    type_tag: type_tag.to_string(),
                    name: name.to_string(),
                })?;
        if !declared.accepts(value) {
            return Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: declared,
            });
        }
        Ok(())
    }
}

impl EntityStore for SqliteEntityStore {
    fn resolve<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<EntityHandle>>> {
        async move { self.resolve_now(id) }.boxed_local()
    }

    fn get_property<'a>(
        &'a self,
        handle: &'a EntityHandle,
        name: &'a str,
    ) -> LocalBoxFuture<'a, StoreResult<Option<PropertyValue>>> {
        async move { self.get_now(handle, name) }.boxed_local()
    }

    fn set_property<'a>(
        &'a self,
        handle: &'a EntityHandle,
        name: &'a str,
        value: PropertyValue,
    ) -> LocalBoxFuture<'a, StoreResult<()>> {
        async move { self.set_now(handle, name, value) }.boxed_local()
    }

    fn create<'a>(
        &'a self,
        type_tag: &'a str,
        initial: PropertyMap,
    ) -> LocalBoxFuture<'a, StoreResult<EntityId>> {
        async move { self.create_now(type_tag, initial) }.boxed_local()
    }

    fn delete<'a>(&'a self, id: &'a str) -> LocalBoxFuture<'a, StoreResult<()>> {
        async move { self.delete_now(id) }.boxed_local()
    }

    fn query_by_type<'a>(
        &'a self,
        type_tag: &'a str,
        filter: Option<&'a PropertyFilter>,
    ) -> LocalBoxFuture<'a, StoreResult<Vec<EntityId>>> {
        async move { self.query_now(type_tag, filter) }.boxed_local()
    }

    fn all_types_implementing<'a>(
        &'a self,
        capability: &'a str,
    ) -> LocalBoxFuture<'a, StoreResult<Vec<String>>> {
        async move { Ok(self.schema.borrow().types_implementing(capability)) }.boxed_local()
    }

    fn watch(&self, id: Option<&str>, listener: ChangeListener) -> ListenerId {
        self.listeners.add_change(id, listener)
    }

    fn on_reloaded(&self, listener: ReloadListener) -> ListenerId {
        self.listeners.add_reload(listener)
    }

    fn remove_listener(&self, listener: ListenerId) {
        self.listeners.remove(listener);
    }
}

fn write_property(
    conn: &Connection,
    id: &str,
    name: &str,
    value: &PropertyValue,
) -> StoreResult<()> {
    if value.is_null() {
        conn.execute(
            "DELETE FROM entity_properties WHERE entity_id = ?1 AND name = ?2;",
            params![id, name],
        )?;
        return Ok(());
    }

    let json = serde_json::to_string(value).map_err(|err| {
        StoreError::InvalidData(format!("cannot encode property `{name}` of {id}: {err}"))
    })?;
    conn.execute(
        "INSERT INTO entity_properties (entity_id, name, value_json)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(entity_id, name) DO UPDATE SET value_json = excluded.value_json;",
        params![id, name, json],
    )?;
    Ok(())
}

fn decode_value(json: &str, id: &str, name: &str) -> StoreResult<PropertyValue> {
    serde_json::from_str(json).map_err(|err| {
        StoreError::InvalidData(format!("property `{name}` of {id} is not decodable: {err}"))
    })
}
