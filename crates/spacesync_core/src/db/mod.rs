//! SQLite persistence for the local entity store.
//!
//! # Responsibility
//! - Open connections for `SqliteEntityStore` (file-backed or in-memory).
//! - Bring the `entities`/`entity_properties` layout up to date before any
//!   entity is read or written.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration.
//! - A store is only constructed over a connection at `latest_version()`;
//!   older connections are migrated on open, newer ones are refused.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the entity database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Database was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    /// Connection was handed to the store without being migrated.
    NotMigrated { found: u32, expected: u32 },
    /// One migration step failed; the whole batch was rolled back.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "entity database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "entity database is at schema {found}, this build supports up to {supported}"
            ),
            Self::NotMigrated { found, expected } => write!(
                f,
                "entity database is at schema {found}, the store needs {expected}"
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "entity migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } | Self::NotMigrated { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
