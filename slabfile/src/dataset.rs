//! Typed datasets.
//!
//! A [`Dataset`] is a handle to a named, persisted N-dimensional array with
//! a declared element encoding and a current extent. Reads and writes
//! operate over an optional memory-side [`Dataspace`] and an optional
//! file-side [`Dataspace`]; [`Dataset::read_slice`] and
//! [`Dataset::write_slice`] accept [`SlabIndex`] expressions directly.
//!
//! All calls are blocking and all-or-nothing: precondition violations are
//! reported before any native call is issued, and a storage failure leaves
//! no partial result.

mod dataset_errors;
pub mod element;

pub use dataset_errors::DatasetError;
pub use element::{Element, ElementBytes, ElementOwned};

use std::borrow::Cow;
use std::marker::PhantomData;

use crate::dataspace::Dataspace;
use crate::extent::{Extent, IncompatibleRankError};
use crate::handle::ObjectHandle;
use crate::hyperslab::SlabIndex;
use crate::storage::Datatype;

/// A handle to a named, persisted, typed N-dimensional array.
///
/// Two datasets opened on the same name are independent handles observing
/// the same underlying extent.
#[derive(Debug)]
pub struct Dataset<T: Element> {
    handle: ObjectHandle,
    name: String,
    datatype: Datatype,
    marker: PhantomData<T>,
}

impl<T: Element> Dataset<T> {
    pub(crate) fn new(handle: ObjectHandle, name: &str, datatype: Datatype) -> Self {
        if !datatype.order().is_native() {
            log::warn!(
                "dataset {name} is {} but the host is {}; transfers pass bytes through unswapped",
                datatype.order(),
                crate::storage::ByteOrder::NATIVE,
            );
        }
        Self {
            handle,
            name: name.to_string(),
            datatype,
            marker: PhantomData,
        }
    }

    /// Return the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the dataset datatype.
    #[must_use]
    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    /// Return the current extent, fetched from the persisted object.
    ///
    /// # Errors
    /// Returns [`DatasetError::Storage`] on a storage failure.
    pub fn extent(&self) -> Result<Extent, DatasetError> {
        let (dims, max_dims) = self.handle.backend().dataset_extent(self.handle.id())?;
        Ok(Extent::from_descriptor(dims, max_dims))
    }

    /// Return a dataspace over the current extent with a select-all
    /// selection.
    ///
    /// # Errors
    /// Returns [`DatasetError::Storage`] on a storage failure.
    pub fn space(&self) -> Result<Dataspace, DatasetError> {
        Ok(Dataspace::from_extent(self.extent()?))
    }

    /// Return the chunk shape of the dataset's storage layout, if chunked.
    ///
    /// # Errors
    /// Returns [`DatasetError::Storage`] on a storage failure.
    pub fn chunk_shape(&self) -> Result<Option<Vec<u64>>, DatasetError> {
        Ok(self.handle.backend().dataset_chunk_shape(self.handle.id())?)
    }

    /// Set the extent of the dataset.
    ///
    /// Growth is always explicit: writes never grow the extent. The change
    /// is rejected, never clamped.
    ///
    /// # Errors
    /// Returns [`DatasetError::ExtentFixed`] if the dataset was not created
    /// with room to change on a violating axis.
    pub fn set_extent(&self, dims: &[u64]) -> Result<(), DatasetError> {
        let extent = self.extent()?;
        extent
            .permits(dims)
            .map_err(DatasetError::from_extent_change)?;
        self.handle
            .backend()
            .set_dataset_extent(self.handle.id(), dims)?;
        log::debug!("dataset {} extent set to {dims:?}", self.name);
        Ok(())
    }

    /// Write `data` through an optional memory-side and an optional
    /// file-side dataspace.
    ///
    /// An omitted `file_space` defaults to the dataset's whole current
    /// dataspace; an omitted `mem_space` defaults to a dataspace shaped to
    /// the file-side selection extent. `data` must hold exactly one element
    /// per selected position.
    ///
    /// # Errors
    /// Returns [`DatasetError::ShapeMismatch`] if the selection sizes or the
    /// buffer length disagree, [`DatasetError::Selection`] if a selection
    /// escapes its extent, and [`DatasetError::Storage`] if the transfer
    /// fails. All precondition checks happen before any native call.
    pub fn write(
        &self,
        data: &[T],
        mem_space: Option<&Dataspace>,
        file_space: Option<&Dataspace>,
    ) -> Result<(), DatasetError> {
        let (mem, file) = self.resolve_spaces(mem_space, file_space)?;
        let count = mem.selection_size();
        if data.len() as u64 != count {
            return Err(DatasetError::ShapeMismatch {
                got: data.len() as u64,
                expected: count,
            });
        }
        // fully materialise every element before the single aggregate write
        let bytes = T::encode(&self.datatype, data)?;
        match bytes {
            ElementBytes::Fixed(bytes) => self.handle.backend().write_fixed(
                self.handle.id(),
                &self.datatype,
                &bytes,
                Some(&mem.selection().to_raw()),
                Some(&file.selection().to_raw()),
            )?,
            ElementBytes::Variable(runs) => self.handle.backend().write_variable(
                self.handle.id(),
                &runs,
                Some(&mem.selection().to_raw()),
                Some(&file.selection().to_raw()),
            )?,
        }
        Ok(())
    }

    /// Write one element per position of the dataset's current extent.
    ///
    /// # Errors
    /// As [`Dataset::write`].
    pub fn write_all(&self, data: &[T]) -> Result<(), DatasetError> {
        self.write(data, None, None)
    }

    /// Write `data` to the selection described by `expressions`.
    ///
    /// Equivalent to selecting the expressions on the dataset's current
    /// dataspace and writing with a memory dataspace shaped to the
    /// selection.
    ///
    /// # Errors
    /// As [`Dataset::write`], plus [`DatasetError::Selection`] for
    /// unresolvable expressions.
    pub fn write_slice(&self, data: &[T], expressions: &[SlabIndex]) -> Result<(), DatasetError> {
        let (mem, file) = self.slice_spaces(expressions)?;
        self.write(data, Some(&mem), Some(&file))
    }

    /// Grow the dataset along `axis` and write `data` into the new region.
    ///
    /// The extent grows by `dimensions[axis]` along `axis`; any other axis
    /// grows to `dimensions[j]` if that exceeds its current size. The newly
    /// added region (starting at the old extent along `axis`, at zero
    /// elsewhere) is then written with the shape `dimensions`.
    ///
    /// # Errors
    /// Returns [`DatasetError::ExtentFixed`] if the dataset cannot grow on a
    /// required axis (nothing is written), plus the [`Dataset::write`]
    /// errors.
    pub fn append(&self, data: &[T], dimensions: &[u64], axis: usize) -> Result<(), DatasetError> {
        let extent = self.extent()?;
        let rank = extent.rank();
        if dimensions.len() != rank {
            return Err(DatasetError::Extent(
                IncompatibleRankError::new(dimensions.len(), rank).into(),
            ));
        }
        if axis >= rank {
            return Err(DatasetError::InvalidAxis { axis, rank });
        }
        let expected: u64 = dimensions.iter().product();
        if data.len() as u64 != expected {
            return Err(DatasetError::ShapeMismatch {
                got: data.len() as u64,
                expected,
            });
        }

        let old_dims = extent.dims().to_vec();
        let mut new_dims = old_dims.clone();
        new_dims[axis] += dimensions[axis];
        for (j, &requested) in dimensions.iter().enumerate() {
            if j != axis && requested > new_dims[j] {
                new_dims[j] = requested;
            }
        }
        extent
            .permits(&new_dims)
            .map_err(DatasetError::from_extent_change)?;
        self.handle
            .backend()
            .set_dataset_extent(self.handle.id(), &new_dims)?;
        log::debug!("dataset {} extent grown to {new_dims:?}", self.name);

        let mut file = self.space()?;
        let mut start = vec![0; rank];
        start[axis] = old_dims[axis];
        file.select_hyperslab(&start, None, Some(dimensions), None)?;
        let mem = Dataspace::new(dimensions.to_vec());
        self.write(data, Some(&mem), Some(&file))
    }

    /// Resolve the two transfer-side dataspaces and check their selections.
    fn resolve_spaces<'a>(
        &self,
        mem_space: Option<&'a Dataspace>,
        file_space: Option<&'a Dataspace>,
    ) -> Result<(Cow<'a, Dataspace>, Cow<'a, Dataspace>), DatasetError> {
        let file = match file_space {
            Some(space) => Cow::Borrowed(space),
            None => Cow::Owned(self.space()?),
        };
        let mem = match mem_space {
            Some(space) => Cow::Borrowed(space),
            None => Cow::Owned(Dataspace::new(file.selection().shape())),
        };
        let got = mem.selection_size();
        let expected = file.selection_size();
        if got != expected {
            return Err(DatasetError::ShapeMismatch { got, expected });
        }
        mem.selection().validate_within(mem.dims())?;
        file.selection().validate_within(file.dims())?;
        Ok((mem, file))
    }

    /// Build the file- and memory-side dataspaces of a slice operation.
    fn slice_spaces(
        &self,
        expressions: &[SlabIndex],
    ) -> Result<(Dataspace, Dataspace), DatasetError> {
        let mut file = self.space()?;
        file.select(expressions)?;
        let mem = Dataspace::new(file.selection().shape());
        Ok((mem, file))
    }
}

impl<T: ElementOwned> Dataset<T> {
    /// Read the selected elements through an optional memory-side and an
    /// optional file-side dataspace.
    ///
    /// Defaults resolve as in [`Dataset::write`]. The returned buffer holds
    /// the selected elements in row-major order relative to the memory-side
    /// selection shape.
    ///
    /// # Errors
    /// As [`Dataset::write`].
    pub fn read(
        &self,
        mem_space: Option<&Dataspace>,
        file_space: Option<&Dataspace>,
    ) -> Result<Vec<T>, DatasetError> {
        let (mem, file) = self.resolve_spaces(mem_space, file_space)?;
        let count = mem.selection_size();
        let elements = if self.datatype.is_variable_length() {
            let buffer = self.handle.backend().read_variable(
                self.handle.id(),
                Some(&mem.selection().to_raw()),
                Some(&file.selection().to_raw()),
            )?;
            // decode into owned strings, then drop (reclaim) the native buffer
            T::decode(&self.datatype, ElementBytes::Variable(buffer.into_runs()))?
        } else {
            let bytes = self.handle.backend().read_fixed(
                self.handle.id(),
                &self.datatype,
                Some(&mem.selection().to_raw()),
                Some(&file.selection().to_raw()),
            )?;
            T::decode(&self.datatype, ElementBytes::Fixed(Cow::Borrowed(&bytes)))?
        };
        if elements.len() as u64 != count {
            return Err(DatasetError::ShapeMismatch {
                got: elements.len() as u64,
                expected: count,
            });
        }
        Ok(elements)
    }

    /// Read every element of the dataset's current extent.
    ///
    /// # Errors
    /// As [`Dataset::read`].
    pub fn read_all(&self) -> Result<Vec<T>, DatasetError> {
        self.read(None, None)
    }

    /// Read the selection described by `expressions`.
    ///
    /// Equivalent to selecting the expressions on the dataset's current
    /// dataspace and reading with a memory dataspace shaped to the
    /// selection.
    ///
    /// # Errors
    /// As [`Dataset::read`], plus [`DatasetError::Selection`] for
    /// unresolvable expressions.
    pub fn read_slice(&self, expressions: &[SlabIndex]) -> Result<Vec<T>, DatasetError> {
        let (mem, file) = self.slice_spaces(expressions)?;
        self.read(Some(&mem), Some(&file))
    }
}
