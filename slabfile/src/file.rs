//! Files.
//!
//! A [`File`] is the caller-facing entry point to a hierarchy: a container
//! of groups and datasets persisted by a storage backend, addressed by
//! path. A file implements [`GroupScope`], acting as its own root group.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::group::GroupScope;
use crate::handle::ObjectHandle;
use crate::storage::{SharedBackend, StorageError};

pub use crate::storage::{CreateMode, OpenMode};

/// A file error.
#[derive(Clone, Debug, Error)]
pub enum FileError {
    /// The storage runtime reported a failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An open file.
#[derive(Debug)]
pub struct File {
    handle: ObjectHandle,
    path: PathBuf,
}

impl File {
    /// Create a file at `path` in `backend`.
    ///
    /// # Errors
    /// Returns [`FileError`] if `mode` is [`CreateMode::Exclusive`] and the
    /// path exists, or on a storage failure.
    pub fn create(
        backend: SharedBackend,
        path: impl AsRef<Path>,
        mode: CreateMode,
    ) -> Result<Self, FileError> {
        let path = path.as_ref();
        let id = backend.create_file(path, mode)?;
        Ok(Self {
            handle: ObjectHandle::new(backend, id),
            path: path.to_path_buf(),
        })
    }

    /// Open an existing file at `path` in `backend`.
    ///
    /// # Errors
    /// Returns [`FileError`] if the path does not exist or on a storage
    /// failure.
    pub fn open(
        backend: SharedBackend,
        path: impl AsRef<Path>,
        mode: OpenMode,
    ) -> Result<Self, FileError> {
        let path = path.as_ref();
        let id = backend.open_file(path, mode)?;
        Ok(Self {
            handle: ObjectHandle::new(backend, id),
            path: path.to_path_buf(),
        })
    }

    /// Return the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush any buffered state of the file to the storage runtime.
    ///
    /// # Errors
    /// Returns [`FileError`] on a storage failure.
    pub fn flush(&self) -> Result<(), FileError> {
        Ok(self.handle.backend().flush_file(self.handle.id())?)
    }
}

impl GroupScope for File {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }
}
