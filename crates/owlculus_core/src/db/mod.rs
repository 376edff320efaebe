//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the cases and clients stores.
//! - Apply schema migrations in deterministic order, per store.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - `cases.db` and `clients.db` are separate files with separate histories.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// File name of the cases store inside `paths.cases_db_path`.
pub const CASES_DB_FILE_NAME: &str = "cases.db";
/// File name of the clients store inside `paths.clients_db_path`.
pub const CLIENTS_DB_FILE_NAME: &str = "clients.db";

pub type DbResult<T> = Result<T, DbError>;

/// Which logical store a connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Cases,
    Clients,
}

impl Schema {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cases => "cases",
            Self::Clients => "clients",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Cases => CASES_DB_FILE_NAME,
            Self::Clients => CLIENTS_DB_FILE_NAME,
        }
    }
}

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    UnsupportedSchemaVersion {
        schema: Schema,
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                schema,
                db_version,
                latest_supported,
            } => write!(
                f,
                "{} database schema version {db_version} is newer than supported {latest_supported}",
                schema.label()
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
