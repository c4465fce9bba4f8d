//! Repository and unit-of-work error type.

use crate::db::DbError;
use crate::model::{EntityId, EntityKind};
use rusqlite::{ffi, ErrorCode};
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },
    /// UNIQUE or PRIMARY KEY violation.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    /// FOREIGN KEY violation, including restricted deletes.
    #[error("referential integrity violated: {0}")]
    ReferentialIntegrity(String),
    #[error("{kind} has no relation named `{name}`")]
    UnknownRelation { kind: EntityKind, name: String },
    #[error("{kind} has no column named `{name}`")]
    UnknownColumn { kind: EntityKind, name: String },
    #[error("expected at most one {kind}, found {count}")]
    MultipleResults { kind: EntityKind, count: usize },
    #[error("{kind} carries no identity")]
    MissingIdentity { kind: EntityKind },
    #[error("operation cancelled")]
    Cancelled,
    #[error("unit of work misuse: {0}")]
    CallerMisuse(&'static str),
    #[error("transaction is rollback-only")]
    RollbackOnly,
    #[error("connection schema version {actual_version} does not match expected {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, message) = &value {
            let detail = message.clone().unwrap_or_else(|| err.to_string());
            match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::ReferentialIntegrity(detail),
                _ => {}
            }
            if err.code == ErrorCode::OperationInterrupted {
                return Self::Cancelled;
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}
