//! Command and query handlers.
//!
//! # Responsibility
//! - Turn validated requests into repository reads and unit-of-work writes.
//! - Translate repository failures into `AppError` at the handler boundary.
//!
//! # Invariants
//! - Every request is validated before its handler runs (`dispatch`).
//! - Handlers log nothing that identifies a person beyond ids.

pub mod dispatch;
pub mod error;
pub mod person_commands;
pub mod person_queries;
mod reconcile;
pub mod relationship_commands;
pub mod relationship_report;

pub use dispatch::{dispatch, HandlerContext, Request};
pub use error::{AppError, AppResult};
pub use person_commands::{
    CreatePerson, DeletePerson, NewPhoneNumber, NewRelatedIndividual, PhoneNumberChange,
    UpdatePerson, UploadOrChangeImage,
};
pub use person_queries::{GetPersonById, GetPersonsFiltered};
pub use relationship_commands::{AddRelationship, DeleteRelationship};
pub use relationship_report::{GetRelationshipReport, RelationshipReport, RelationshipTypeCount};
