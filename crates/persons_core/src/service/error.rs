//! Handler-boundary error type.

use crate::model::{EntityId, EntityKind};
use crate::repo::RepoError;
use crate::validation::FieldError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: EntityId },
    #[error("validation failed: {}", describe_fields(.0))]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    /// Unexpected failure during a write; `description` keeps the cause.
    #[error("{description}")]
    OperationFailure {
        code: &'static str,
        description: String,
    },
    #[error("{0}")]
    CallerMisuse(String),
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation_failed",
            Self::Conflict(_) => "conflict",
            Self::OperationFailure { code, .. } => code,
            Self::CallerMisuse(_) => "caller_misuse",
        }
    }

    pub(crate) fn failure(code: &'static str, description: impl Into<String>) -> Self {
        Self::OperationFailure {
            code,
            description: description.into(),
        }
    }

    /// Classifies a repository error raised while performing `action`.
    ///
    /// Uniqueness violations stay `Conflict`; state-machine violations stay
    /// `CallerMisuse`; everything else becomes `OperationFailure` under `code`.
    pub(crate) fn from_repo(code: &'static str, action: &str, err: RepoError) -> Self {
        match err {
            RepoError::NotFound { kind, id } => Self::NotFound { entity: kind, id },
            RepoError::Conflict(detail) => Self::Conflict(format!("{action}: {detail}")),
            RepoError::CallerMisuse(_) | RepoError::RollbackOnly => Self::CallerMisuse(err.to_string()),
            other => Self::failure(code, format!("{action}. Error: {other}")),
        }
    }
}

fn describe_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| format!("{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ")
}
