//! Groups.
//!
//! A [`Group`] is a naming and lifecycle scope for datasets and nested
//! groups. The [`GroupScope`] trait carries the shared surface of groups and
//! [`File`](crate::file::File)s: creation, lookup by name, and enumeration.

use thiserror::Error;

use crate::dataset::{Dataset, DatasetError, Element};
use crate::dataspace::Dataspace;
use crate::handle::ObjectHandle;
use crate::storage::{Datatype, StorageError};

/// A group error.
#[derive(Clone, Debug, Error)]
pub enum GroupError {
    /// The storage runtime reported a failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A named scope for datasets and nested groups.
pub trait GroupScope {
    /// Return the storage handle of this scope.
    fn handle(&self) -> &ObjectHandle;

    /// Create a group named `name` in this scope.
    ///
    /// # Errors
    /// Returns [`GroupError`] if the name is taken or on a storage failure.
    fn create_group(&self, name: &str) -> Result<Group, GroupError> {
        let backend = self.handle().backend().clone();
        let id = backend.create_group(self.handle().id(), name)?;
        Ok(Group {
            handle: ObjectHandle::new(backend, id),
            name: name.to_string(),
        })
    }

    /// Open the existing group named `name`.
    ///
    /// # Errors
    /// Returns [`GroupError`] if there is no such group or on a storage
    /// failure.
    fn open_group(&self, name: &str) -> Result<Group, GroupError> {
        let backend = self.handle().backend().clone();
        let id = backend.open_group(self.handle().id(), name)?;
        Ok(Group {
            handle: ObjectHandle::new(backend, id),
            name: name.to_string(),
        })
    }

    /// Return the names of the objects in this scope, sorted.
    ///
    /// # Errors
    /// Returns [`GroupError`] on a storage failure.
    fn object_names(&self) -> Result<Vec<String>, GroupError> {
        Ok(self.handle().backend().list_objects(self.handle().id())?)
    }

    /// Create a dataset named `name` shaped by `space`, with the default
    /// datatype of `T`.
    ///
    /// # Errors
    /// Returns [`DatasetError`] if the name is taken or on a storage
    /// failure.
    fn create_dataset<T: Element>(
        &self,
        name: &str,
        space: &Dataspace,
    ) -> Result<Dataset<T>, DatasetError> {
        self.create_dataset_with(name, T::default_datatype(), space, None)
    }

    /// Create a dataset with a chunked storage layout.
    ///
    /// The chunk shape is an opaque hint to the storage runtime.
    ///
    /// # Errors
    /// As [`GroupScope::create_dataset`].
    fn create_chunked_dataset<T: Element>(
        &self,
        name: &str,
        space: &Dataspace,
        chunk_dims: &[u64],
    ) -> Result<Dataset<T>, DatasetError> {
        self.create_dataset_with(name, T::default_datatype(), space, Some(chunk_dims))
    }

    /// Create a dataset with an explicit datatype.
    ///
    /// Use this for encodings the default mapping cannot express, such as a
    /// fixed-length string dataset of [`String`] elements, or a non-native
    /// byte-order tag.
    ///
    /// # Errors
    /// Returns [`DatasetError::UnknownDataType`] if `T` cannot hold elements
    /// of `datatype`, plus the [`GroupScope::create_dataset`] errors.
    fn create_dataset_with<T: Element>(
        &self,
        name: &str,
        datatype: Datatype,
        space: &Dataspace,
        chunk_dims: Option<&[u64]>,
    ) -> Result<Dataset<T>, DatasetError> {
        T::validate_datatype(&datatype)?;
        let (dims, max_dims) = space.extent().to_descriptor();
        let backend = self.handle().backend().clone();
        let id = backend.create_dataset(
            self.handle().id(),
            name,
            &datatype,
            &dims,
            max_dims.as_deref(),
            chunk_dims,
        )?;
        Ok(Dataset::new(ObjectHandle::new(backend, id), name, datatype))
    }

    /// Open the existing dataset named `name`.
    ///
    /// # Errors
    /// Returns [`DatasetError::UnknownDataType`] if `T` cannot hold elements
    /// of the stored datatype, or [`DatasetError::Storage`] if there is no
    /// such dataset.
    fn open_dataset<T: Element>(&self, name: &str) -> Result<Dataset<T>, DatasetError> {
        let backend = self.handle().backend().clone();
        let id = backend.open_dataset(self.handle().id(), name)?;
        let handle = ObjectHandle::new(backend, id);
        let datatype = handle.backend().dataset_datatype(handle.id())?;
        T::validate_datatype(&datatype)?;
        Ok(Dataset::new(handle, name, datatype))
    }

    /// Create a dataset of shape `dims` and write `data` to it.
    ///
    /// # Errors
    /// As [`GroupScope::create_dataset`] and [`Dataset::write`].
    fn create_and_write_dataset<T: Element>(
        &self,
        name: &str,
        dims: Vec<u64>,
        data: &[T],
    ) -> Result<Dataset<T>, DatasetError> {
        let dataset = self.create_dataset(name, &Dataspace::new(dims))?;
        dataset.write_all(data)?;
        Ok(dataset)
    }
}

/// A named group within a file.
#[derive(Debug)]
pub struct Group {
    handle: ObjectHandle,
    name: String,
}

impl Group {
    /// Return the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl GroupScope for Group {
    fn handle(&self) -> &ObjectHandle {
        &self.handle
    }
}
