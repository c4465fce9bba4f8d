//! Persistence layer: generic repository plus unit of work.
//!
//! # Responsibility
//! - Read and stage writes for every entity kind through one generic
//!   `Repository`, driven by `Entity` metadata.
//! - Group staged writes into atomic flushes and explicit transactions via
//!   `UnitOfWork`.
//!
//! # Invariants
//! - Every write path goes through a unit of work flush.
//! - Storage failures surface as `RepoError`, with constraint violations
//!   classified as `Conflict` or `ReferentialIntegrity`.

mod clock;
pub mod error;
pub mod filter;
pub mod repository;
mod sql;
pub mod store;
pub mod tracker;
pub mod unit_of_work;

pub use error::{RepoError, RepoResult};
pub use filter::{Direction, Filter, ListQuery, OrderBy, Page};
pub use repository::Repository;
pub use store::Store;
pub use tracker::{EntryState, Staged};
pub use unit_of_work::{UnitOfWork, UnitOfWorkState};
