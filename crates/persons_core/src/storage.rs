//! Image file storage used by the image upload handler.
//!
//! # Responsibility
//! - Persist uploaded image bytes and return the stored path.
//! - Remove previously stored images.
//!
//! # Invariants
//! - Stored file names are random and keep the uploaded extension.
//! - Deleting a path that no longer exists is not an error.

use crate::model::EntityId;
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("the image file is empty")]
    EmptyPayload,
    #[error("image storage i/o failed at `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Collaborator that stores person images outside the database.
pub trait FileStorage {
    /// Stores `bytes` and returns the path to persist on the person.
    fn save_image(&self, person_id: EntityId, file_name: &str, bytes: &[u8]) -> StorageResult<String>;

    fn delete_image(&self, path: &str) -> StorageResult<()>;
}

/// Stores images as files in one directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStorage for LocalFileStorage {
    fn save_image(&self, person_id: EntityId, file_name: &str, bytes: &[u8]) -> StorageResult<String> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyPayload);
        }
        std::fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;

        let stored_name = match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
            Some(extension) => format!("{}.{extension}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let path = self.root.join(stored_name);
        std::fs::write(&path, bytes).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            "event=image_save module=storage status=ok person_id={person_id} bytes={}",
            bytes.len()
        );
        Ok(path.to_string_lossy().into_owned())
    }

    fn delete_image(&self, path: &str) -> StorageResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("event=image_delete module=storage status=ok");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("event=image_delete module=storage status=missing");
                Ok(())
            }
            Err(source) => Err(StorageError::Io {
                path: PathBuf::from(path),
                source,
            }),
        }
    }
}
