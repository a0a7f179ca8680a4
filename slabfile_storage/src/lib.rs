//! The storage runtime API for the [`slabfile`](https://docs.rs/slabfile/latest/slabfile/index.html) crate.
//!
//! A storage runtime persists files, groups, and typed N-dimensional array
//! objects, and moves raw bytes between host buffers and stored arrays.
//! The [`StorageBackend`] trait is the narrow, handle-based interface the
//! `slabfile` core calls through; [`MemoryBackend`](memory::MemoryBackend) is
//! the reference in-memory implementation.
//!
//! Objects are addressed by [`ObjectId`] handles. Handles are scarce,
//! process-wide resources: every handle issued must be released exactly once
//! with [`StorageBackend::close_object`]. Transfers are blocking and
//! all-or-nothing; elements move in row-major selection order on both sides.
//!
//! ## Licence
//! `slabfile_storage` is licensed under either of
//! - the Apache License, Version 2.0 or
//! - the MIT license, at your option.

pub mod datatype;
pub mod memory;
pub mod selection;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use auto_impl::auto_impl;
use thiserror::Error;

pub use datatype::{ByteOrder, Datatype, NativeKind};
pub use memory::MemoryBackend;
pub use selection::{IncompatibleShapeError, RawSelection};

/// The type for bytes returned by fixed-width reads.
///
/// An alias for [`bytes::Bytes`].
pub type Bytes = bytes::Bytes;

/// An opaque handle to an object held open by a storage backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, derive_more::Display)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Create an object id. Intended for backend implementations.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Return the numeric value of the id.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// The mode for creating a file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreateMode {
    /// Overwrite an existing file.
    Truncate,
    /// Fail if the file already exists.
    Exclusive,
}

/// The mode for opening an existing file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Open for reading only.
    ReadOnly,
    /// Open for reading and writing.
    ReadWrite,
}

/// The per-dimension maximum sizes of a resizable dataset.
///
/// [`None`] in a component means the axis is unbounded.
pub type MaxDims = Vec<Option<u64>>;

/// A native transfer buffer holding the result of a variable-length read.
///
/// Each element is an independently allocated, null-terminated run. The
/// buffer owns all runs; dropping it reclaims every run exactly once.
/// Decode elements into owned host strings before the buffer is dropped.
#[derive(Debug)]
pub struct VariableBuffer {
    runs: Vec<Vec<u8>>,
}

impl VariableBuffer {
    /// Create a buffer from null-terminated runs. Intended for backend
    /// implementations.
    #[must_use]
    pub fn new(runs: Vec<Vec<u8>>) -> Self {
        Self { runs }
    }

    /// Return the number of elements in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Return the null-terminated runs.
    #[must_use]
    pub fn runs(&self) -> &[Vec<u8>] {
        &self.runs
    }

    /// Consume the buffer, transferring ownership of every run to the caller.
    #[must_use]
    pub fn into_runs(self) -> Vec<Vec<u8>> {
        self.runs
    }
}

/// A storage error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A write operation was attempted on a read-only file.
    #[error("a write operation was attempted on a read-only file")]
    ReadOnly,
    /// The file already exists (exclusive creation).
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),
    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// A named object does not exist.
    #[error("object not found: {_0}")]
    ObjectNotFound(String),
    /// A named object already exists.
    #[error("object already exists: {_0}")]
    ObjectExists(String),
    /// The handle does not refer to a live object.
    #[error("stale object handle: {_0}")]
    StaleHandle(ObjectId),
    /// The named object is not of the expected kind.
    #[error("object {_0} is not of the expected kind")]
    WrongObjectKind(String),
    /// The element-kind tag of a transfer does not match the stored datatype.
    #[error("transfer datatype {_0} does not match stored datatype {_1}")]
    DatatypeMismatch(Datatype, Datatype),
    /// A requested extent exceeds the maximum extent on an axis.
    #[error("requested extent exceeds the maximum extent on axis {axis}")]
    ExtentBounds {
        /// The violating axis.
        axis: usize,
    },
    /// A selection escapes the stored extent.
    #[error(transparent)]
    OutOfBounds(#[from] IncompatibleShapeError),
    /// The two sides of a transfer are inconsistent.
    #[error("invalid transfer: {_0}")]
    InvalidTransfer(String),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// Any other error.
    #[error("{_0}")]
    Other(String),
}

/// The storage runtime interface.
///
/// Every method is blocking. `mem` and `file` selections default to
/// select-all over the corresponding extent when [`None`]: the dataset's
/// current extent on the file side, a flat extent sized to the transfer on
/// the memory side. Transfers pair elements positionally in row-major
/// selection order and are all-or-nothing: on error, no partial result is
/// returned and only the selected file region has undefined content.
#[auto_impl(Arc)]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Create a file, returning a handle to its root group.
    ///
    /// # Errors
    /// Returns [`StorageError::FileExists`] if `mode` is
    /// [`CreateMode::Exclusive`] and `path` exists.
    fn create_file(&self, path: &Path, mode: CreateMode) -> Result<ObjectId, StorageError>;

    /// Open an existing file, returning a handle to its root group.
    ///
    /// # Errors
    /// Returns [`StorageError::FileNotFound`] if `path` does not exist.
    fn open_file(&self, path: &Path, mode: OpenMode) -> Result<ObjectId, StorageError>;

    /// Flush any buffered state of the file owning `file`.
    ///
    /// # Errors
    /// Returns [`StorageError::StaleHandle`] if `file` is not live.
    fn flush_file(&self, file: ObjectId) -> Result<(), StorageError>;

    /// Create a group named `name` under `parent`.
    ///
    /// # Errors
    /// Returns [`StorageError::ObjectExists`] if the name is taken.
    fn create_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError>;

    /// Open the group named `name` under `parent`.
    ///
    /// # Errors
    /// Returns [`StorageError::ObjectNotFound`] if there is no such object or
    /// [`StorageError::WrongObjectKind`] if it is not a group.
    fn open_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError>;

    /// Return the names of the objects directly under `parent`, sorted.
    ///
    /// # Errors
    /// Returns [`StorageError::StaleHandle`] if `parent` is not live.
    fn list_objects(&self, parent: ObjectId) -> Result<Vec<String>, StorageError>;

    /// Release the handle `id`.
    ///
    /// Every handle must be released exactly once.
    ///
    /// # Errors
    /// Returns [`StorageError::StaleHandle`] if `id` was already released.
    fn close_object(&self, id: ObjectId) -> Result<(), StorageError>;

    /// Create a dataset named `name` under `parent`.
    ///
    /// `max_dims` enables later extent growth; `chunk` is an opaque storage
    /// layout hint.
    ///
    /// # Errors
    /// Returns [`StorageError::ObjectExists`] if the name is taken.
    fn create_dataset(
        &self,
        parent: ObjectId,
        name: &str,
        datatype: &Datatype,
        dims: &[u64],
        max_dims: Option<&[Option<u64>]>,
        chunk: Option<&[u64]>,
    ) -> Result<ObjectId, StorageError>;

    /// Open the dataset named `name` under `parent`.
    ///
    /// # Errors
    /// Returns [`StorageError::ObjectNotFound`] if there is no such object or
    /// [`StorageError::WrongObjectKind`] if it is not a dataset.
    fn open_dataset(&self, parent: ObjectId, name: &str) -> Result<ObjectId, StorageError>;

    /// Return the datatype of a dataset.
    ///
    /// # Errors
    /// Returns [`StorageError::StaleHandle`] if `dataset` is not live.
    fn dataset_datatype(&self, dataset: ObjectId) -> Result<Datatype, StorageError>;

    /// Return the current extent of a dataset and its maximum extent, if any.
    ///
    /// # Errors
    /// Returns [`StorageError::StaleHandle`] if `dataset` is not live.
    fn dataset_extent(&self, dataset: ObjectId) -> Result<(Vec<u64>, Option<MaxDims>), StorageError>;

    /// Set the current extent of a dataset.
    ///
    /// Grown regions read as zero bytes (empty strings for variable-length
    /// kinds) until written.
    ///
    /// # Errors
    /// Returns [`StorageError::ExtentBounds`] if a component exceeds a
    /// bounded maximum dimension.
    fn set_dataset_extent(&self, dataset: ObjectId, dims: &[u64]) -> Result<(), StorageError>;

    /// Return the chunk shape of a dataset's storage layout, if chunked.
    ///
    /// # Errors
    /// Returns [`StorageError::StaleHandle`] if `dataset` is not live.
    fn dataset_chunk_shape(&self, dataset: ObjectId) -> Result<Option<Vec<u64>>, StorageError>;

    /// Read the file-selected elements of a fixed-width dataset.
    ///
    /// # Errors
    /// Returns [`StorageError::DatatypeMismatch`] if `datatype` does not
    /// match the stored datatype, [`StorageError::OutOfBounds`] if a
    /// selection escapes its extent, or [`StorageError::InvalidTransfer`] if
    /// the two selection sizes disagree.
    fn read_fixed(
        &self,
        dataset: ObjectId,
        datatype: &Datatype,
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<Bytes, StorageError>;

    /// Write `data` to the file-selected elements of a fixed-width dataset.
    ///
    /// # Errors
    /// As [`StorageBackend::read_fixed`], plus [`StorageError::ReadOnly`] for
    /// read-only files.
    fn write_fixed(
        &self,
        dataset: ObjectId,
        datatype: &Datatype,
        data: &[u8],
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<(), StorageError>;

    /// Read the file-selected elements of a variable-length dataset into a
    /// native transfer buffer of null-terminated runs.
    ///
    /// # Errors
    /// As [`StorageBackend::read_fixed`].
    fn read_variable(
        &self,
        dataset: ObjectId,
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<VariableBuffer, StorageError>;

    /// Write null-terminated `runs` to the file-selected elements of a
    /// variable-length dataset.
    ///
    /// Every run must stay alive for the duration of the call; passing them
    /// by reference makes that structural.
    ///
    /// # Errors
    /// As [`StorageBackend::write_fixed`].
    fn write_variable(
        &self,
        dataset: ObjectId,
        runs: &[Vec<u8>],
        mem: Option<&RawSelection>,
        file: Option<&RawSelection>,
    ) -> Result<(), StorageError>;
}

/// [`Arc`] wrapped storage backend.
pub type SharedBackend = Arc<dyn StorageBackend>;
