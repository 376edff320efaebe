//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for cases and clients.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories never touch the filesystem.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod case_repo;
pub mod client_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error shared by the case and client repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A `UNIQUE` constraint rejected the write.
    UniqueViolation(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UniqueViolation(message) => write!(f, "unique constraint violated: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UniqueViolation(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &value {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                return Self::UniqueViolation(
                    message.clone().unwrap_or_else(|| "UNIQUE".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}
