//! Store handle that opens one fresh connection per unit of work.

use crate::db::{open_db, DbResult};
use crate::repo::error::RepoResult;
use crate::repo::unit_of_work::UnitOfWork;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Opens the database once so the schema is migrated before any unit of
    /// work is created.
    pub fn open(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        drop(open_db(&path)?);
        info!("event=store_open module=repo status=ok path={}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn unit_of_work(&self) -> RepoResult<UnitOfWork> {
        let conn = open_db(&self.path)?;
        UnitOfWork::try_new(conn)
    }
}
