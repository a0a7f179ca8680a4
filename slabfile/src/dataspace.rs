//! Dataspaces.
//!
//! A [`Dataspace`] couples an [`Extent`] with exactly one active
//! [`Selection`] and describes one side of an I/O transfer: where elements
//! come from or go to, on either the memory side or the file side. A
//! dataspace is a plain value: it outlives any single read or write and may
//! be reused or repositioned with [`Dataspace::offset`].

use crate::extent::{Extent, ExtentError, IncompatibleRankError, MaxDim};
use crate::hyperslab::{Selection, SelectionError, SlabIndex};

/// An extent plus its active selection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dataspace {
    extent: Extent,
    selection: Selection,
}

impl Dataspace {
    /// Create a dataspace with a fixed extent and a select-all selection.
    #[must_use]
    pub fn new(dims: Vec<u64>) -> Self {
        Self::from_extent(Extent::new(dims))
    }

    /// Create a dataspace with a resizable extent and a select-all selection.
    ///
    /// # Errors
    /// Returns [`ExtentError`] if `max_dims` is incompatible with `dims`.
    pub fn new_bounded(dims: Vec<u64>, max_dims: Vec<MaxDim>) -> Result<Self, ExtentError> {
        Ok(Self::from_extent(Extent::new_bounded(dims, max_dims)?))
    }

    /// Create a dataspace from an extent, with a select-all selection.
    #[must_use]
    pub fn from_extent(extent: Extent) -> Self {
        let selection = Selection::all(extent.dims());
        Self { extent, selection }
    }

    /// Return the extent.
    #[must_use]
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Return the size of each dimension.
    #[must_use]
    pub fn dims(&self) -> &[u64] {
        self.extent.dims()
    }

    /// Return the dimensionality.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.extent.rank()
    }

    /// Return the total number of elements in the extent.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.extent.num_elements()
    }

    /// Return the active selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn selection_size(&self) -> u64 {
        self.selection.num_elements()
    }

    /// Return the number of selected elements as a `usize`.
    ///
    /// # Panics
    /// Panics if the selection size exceeds [`usize::MAX`].
    #[must_use]
    pub fn selection_size_usize(&self) -> usize {
        usize::try_from(self.selection_size()).unwrap()
    }

    /// Returns true if the active selection fits within the current extent.
    ///
    /// Recomputed on every call: the extent may have changed since the
    /// selection was made, and [`Dataspace::offset`] does not revalidate.
    #[must_use]
    pub fn has_valid_selection(&self) -> bool {
        self.selection.validate_within(self.extent.dims()).is_ok()
    }

    /// Select every element of the extent.
    ///
    /// Replaces the previous selection.
    pub fn select_all(&mut self) {
        self.selection = Selection::all(self.extent.dims());
    }

    /// Select no elements.
    ///
    /// Replaces the previous selection with a valid, empty selection.
    pub fn select_none(&mut self) {
        self.selection = Selection::none(self.extent.rank());
    }

    /// Select the elements described by an ordered list of index
    /// expressions.
    ///
    /// Dimensions beyond `expressions.len()` default to select-all.
    /// Replaces the previous selection; on error the previous selection is
    /// kept.
    ///
    /// # Errors
    /// Returns [`SelectionError`] as [`Selection::resolve`] does.
    pub fn select(&mut self, expressions: &[SlabIndex]) -> Result<(), SelectionError> {
        self.selection = Selection::resolve(self.extent.dims(), expressions)?;
        Ok(())
    }

    /// Select a hyperslab from per-dimension components.
    ///
    /// `stride` and `block` default to ones and `count` to the extent size
    /// when omitted. Replaces the previous selection; on error the previous
    /// selection is kept.
    ///
    /// # Errors
    /// Returns [`SelectionError::RankMismatch`] if a supplied component does
    /// not match the extent rank, or [`SelectionError::InvalidRange`] if the
    /// selection escapes the extent.
    pub fn select_hyperslab(
        &mut self,
        start: &[u64],
        stride: Option<&[u64]>,
        count: Option<&[u64]>,
        block: Option<&[u64]>,
    ) -> Result<(), SelectionError> {
        let rank = self.extent.rank();
        for len in [
            Some(start.len()),
            stride.map(<[u64]>::len),
            count.map(<[u64]>::len),
            block.map(<[u64]>::len),
        ]
        .into_iter()
        .flatten()
        {
            if len != rank {
                return Err(IncompatibleRankError::new(len, rank).into());
            }
        }
        let expressions: Vec<SlabIndex> = (0..rank)
            .map(|dim| SlabIndex::Slab {
                start: start[dim],
                stride: stride.map_or(1, |stride| stride[dim]),
                count: count.map_or(self.extent.dims()[dim], |count| count[dim]),
                block: block.map_or(1, |block| block[dim]),
            })
            .collect();
        self.selection = Selection::resolve(self.extent.dims(), &expressions)?;
        Ok(())
    }

    /// Translate the selection's starts by `deltas` without changing its
    /// shape.
    ///
    /// Repositions an identical-shaped selection, e.g. a sliding window over
    /// successive writes. The selection is not revalidated against the
    /// extent until the next read or write.
    ///
    /// # Errors
    /// Returns [`SelectionError`] as [`Selection::offset_by`] does.
    pub fn offset(&mut self, deltas: &[i64]) -> Result<(), SelectionError> {
        self.selection.offset_by(deltas)
    }

    /// Replace the extent sizes, leaving the selection untouched.
    ///
    /// # Errors
    /// Returns [`ExtentError::IncompatibleRank`] if the rank changes.
    pub fn set_extent(&mut self, dims: Vec<u64>) -> Result<(), ExtentError> {
        if dims.len() != self.extent.rank() {
            return Err(IncompatibleRankError::new(dims.len(), self.extent.rank()).into());
        }
        self.extent.set_dims(dims);
        Ok(())
    }
}
