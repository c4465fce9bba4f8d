//! Core domain logic for the persons directory.
//! Persons, their phone numbers, relationships and cities are stored through a
//! generic repository and unit of work; handlers orchestrate them.

pub mod config;
pub mod db;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;
pub mod validation;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use mapping::{CityResource, PersonResource, PhoneNumberResource, RelationshipResource};
pub use model::{City, Gender, Person, PhoneNumber, PhoneNumberType, Relationship, RelationshipType};
pub use repo::{RepoError, RepoResult, Repository, Store, UnitOfWork, UnitOfWorkState};
pub use service::{dispatch, AppError, AppResult, HandlerContext, Request};
pub use storage::{FileStorage, LocalFileStorage, StorageError};
pub use validation::{FieldError, Validate};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
