//! Resolved hyperslab selections.
//!
//! A [`RawSelection`] is the canonical, fully resolved form of a hyperslab
//! selection: per dimension, a `(start, stride, count, block)` tuple with no
//! open-ended sentinels. It is the only selection representation that crosses
//! the [`StorageBackend`](crate::StorageBackend) boundary.
//!
//! [`SelectionIndices`] and [`ContiguousLinearisedIndices`] iterate the
//! selected element coordinates, last dimension fastest (C-contiguous order).

use std::ops::Range;

use itertools::izip;
use thiserror::Error;

/// Linearise `indices` within an array of shape `array_shape`.
#[must_use]
pub fn ravel_indices(indices: &[u64], array_shape: &[u64]) -> u64 {
    let mut index = 0;
    for (i, s) in std::iter::zip(indices, array_shape) {
        index = index * s + i;
    }
    index
}

/// An invalid raw selection.
#[derive(Clone, Debug, Error)]
#[error("invalid raw selection: {_0}")]
pub struct InvalidRawSelectionError(String);

/// An array shape that does not encapsulate a selection.
#[derive(Clone, Debug, Error)]
#[error("selection with end {end:?} is not encapsulated by array shape {array_shape:?}")]
pub struct IncompatibleShapeError {
    end: Vec<u64>,
    array_shape: Vec<u64>,
}

impl IncompatibleShapeError {
    /// Create a new incompatible shape error.
    #[must_use]
    pub fn new(end: Vec<u64>, array_shape: Vec<u64>) -> Self {
        Self { end, array_shape }
    }
}

/// A resolved hyperslab selection.
///
/// Per dimension: `count` blocks of `block` consecutive elements, the block
/// starts `stride` elements apart, the first block starting at `start`.
/// A `count` of zero selects no elements in that dimension.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct RawSelection {
    start: Vec<u64>,
    stride: Vec<u64>,
    count: Vec<u64>,
    block: Vec<u64>,
}

impl RawSelection {
    /// Create a new raw selection.
    ///
    /// # Errors
    /// Returns [`InvalidRawSelectionError`] if the vectors differ in length or
    /// any `stride` or `block` component is zero.
    pub fn new(
        start: Vec<u64>,
        stride: Vec<u64>,
        count: Vec<u64>,
        block: Vec<u64>,
    ) -> Result<Self, InvalidRawSelectionError> {
        if start.len() != stride.len() || start.len() != count.len() || start.len() != block.len()
        {
            return Err(InvalidRawSelectionError(format!(
                "component ranks differ: {} {} {} {}",
                start.len(),
                stride.len(),
                count.len(),
                block.len()
            )));
        }
        if stride.iter().any(|&s| s == 0) {
            return Err(InvalidRawSelectionError(format!(
                "zero stride in {stride:?}"
            )));
        }
        if block.iter().any(|&b| b == 0) {
            return Err(InvalidRawSelectionError(format!("zero block in {block:?}")));
        }
        Ok(Self {
            start,
            stride,
            count,
            block,
        })
    }

    /// Create a selection covering the whole of an array with `shape`.
    #[must_use]
    pub fn all(shape: &[u64]) -> Self {
        Self {
            start: vec![0; shape.len()],
            stride: vec![1; shape.len()],
            count: shape.to_vec(),
            block: vec![1; shape.len()],
        }
    }

    /// Create an empty selection of the given dimensionality.
    #[must_use]
    pub fn none(dimensionality: usize) -> Self {
        Self {
            start: vec![0; dimensionality],
            stride: vec![1; dimensionality],
            count: vec![0; dimensionality],
            block: vec![1; dimensionality],
        }
    }

    /// Return the per-dimension starts.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the per-dimension strides.
    #[must_use]
    pub fn stride(&self) -> &[u64] {
        &self.stride
    }

    /// Return the per-dimension block counts.
    #[must_use]
    pub fn count(&self) -> &[u64] {
        &self.count
    }

    /// Return the per-dimension block sizes.
    #[must_use]
    pub fn block(&self) -> &[u64] {
        &self.block
    }

    /// Return the dimensionality of the selection.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the shape of the selection: per dimension, `count * block`.
    #[must_use]
    pub fn shape(&self) -> Vec<u64> {
        std::iter::zip(&self.count, &self.block)
            .map(|(count, block)| count * block)
            .collect()
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape().iter().product()
    }

    /// Return the number of selected elements as a `usize`.
    ///
    /// # Panics
    /// Panics if the number of elements exceeds [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if no elements are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count.iter().any(|&c| c == 0)
    }

    /// Return the exclusive end of the selection in each dimension.
    ///
    /// For an empty dimension the end equals its start.
    #[must_use]
    pub fn end_exc(&self) -> Vec<u64> {
        izip!(&self.start, &self.stride, &self.count, &self.block)
            .map(|(&start, &stride, &count, &block)| {
                if count == 0 {
                    start
                } else {
                    start + (count - 1) * stride + block
                }
            })
            .collect()
    }

    /// Returns true if the selection fits within an array of `array_shape`.
    #[must_use]
    pub fn inbounds_shape(&self, array_shape: &[u64]) -> bool {
        self.dimensionality() == array_shape.len()
            && std::iter::zip(self.end_exc(), array_shape).all(|(end, &dim)| end <= dim)
    }

    /// Return the selected positions along dimension `dim`, in order.
    fn dim_positions(&self, dim: usize) -> Vec<u64> {
        let (start, stride, count, block) = (
            self.start[dim],
            self.stride[dim],
            self.count[dim],
            self.block[dim],
        );
        (0..count)
            .flat_map(|c| (0..block).map(move |b| start + c * stride + b))
            .collect()
    }

    /// Return the contiguous runs along the innermost dimension as
    /// `(position, length)` pairs.
    ///
    /// Adjacent blocks merge into a single run when `stride == block`.
    fn inner_runs(&self) -> Vec<(u64, u64)> {
        let dim = self.dimensionality() - 1;
        let (start, stride, count, block) = (
            self.start[dim],
            self.stride[dim],
            self.count[dim],
            self.block[dim],
        );
        if count == 0 {
            vec![]
        } else if stride == block {
            vec![(start, count * block)]
        } else {
            (0..count).map(|c| (start + c * stride, block)).collect()
        }
    }

    /// Returns an iterator over the coordinates of the selected elements.
    #[must_use]
    pub fn indices(&self) -> SelectionIndices {
        SelectionIndices::new(self)
    }

    /// Returns an iterator over `(linearised index, run length)` pairs of
    /// contiguous selected elements within an array of `array_shape`.
    ///
    /// # Errors
    /// Returns [`IncompatibleShapeError`] if `array_shape` does not
    /// encapsulate this selection.
    pub fn contiguous_linearised_indices(
        &self,
        array_shape: &[u64],
    ) -> Result<ContiguousLinearisedIndices, IncompatibleShapeError> {
        ContiguousLinearisedIndices::new(self, array_shape)
    }
}

/// An iterator over the coordinates of the elements of a [`RawSelection`],
/// last dimension fastest.
pub struct SelectionIndices {
    positions: Vec<Vec<u64>>,
    cursor: Vec<usize>,
    done: bool,
}

impl SelectionIndices {
    fn new(selection: &RawSelection) -> Self {
        let positions: Vec<Vec<u64>> = (0..selection.dimensionality())
            .map(|dim| selection.dim_positions(dim))
            .collect();
        let done = positions.iter().any(Vec::is_empty);
        let cursor = vec![0; positions.len()];
        Self {
            positions,
            cursor,
            done,
        }
    }
}

impl Iterator for SelectionIndices {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = std::iter::zip(&self.positions, &self.cursor)
            .map(|(positions, &i)| positions[i])
            .collect();
        // advance the odometer, last dimension fastest
        let mut dim = self.positions.len();
        loop {
            if dim == 0 {
                self.done = true;
                break;
            }
            dim -= 1;
            self.cursor[dim] += 1;
            if self.cursor[dim] < self.positions[dim].len() {
                break;
            }
            self.cursor[dim] = 0;
        }
        Some(item)
    }
}

/// An iterator over the contiguous runs of a [`RawSelection`] linearised
/// within an enclosing array shape.
///
/// The iterator item is a tuple: (linearised start index, run length).
/// Runs span the innermost dimension; adjacent blocks merge when the
/// innermost `stride` equals its `block`.
pub struct ContiguousLinearisedIndices {
    outer: SelectionIndices,
    inner_runs: Vec<(u64, u64)>,
    inner_cursor: usize,
    outer_coords: Option<Vec<u64>>,
    array_shape: Vec<u64>,
}

impl ContiguousLinearisedIndices {
    fn new(
        selection: &RawSelection,
        array_shape: &[u64],
    ) -> Result<Self, IncompatibleShapeError> {
        if !selection.inbounds_shape(array_shape) {
            return Err(IncompatibleShapeError::new(
                selection.end_exc(),
                array_shape.to_vec(),
            ));
        }
        if selection.dimensionality() == 0 {
            // rank 0: one element at the origin
            let mut outer = SelectionIndices::new(&RawSelection::default());
            let outer_coords = outer.next();
            return Ok(Self {
                outer,
                inner_runs: vec![(0, 1)],
                inner_cursor: 0,
                outer_coords,
                array_shape: vec![],
            });
        }
        let outer = RawSelection {
            start: selection.start[..selection.dimensionality() - 1].to_vec(),
            stride: selection.stride[..selection.dimensionality() - 1].to_vec(),
            count: selection.count[..selection.dimensionality() - 1].to_vec(),
            block: selection.block[..selection.dimensionality() - 1].to_vec(),
        };
        let mut outer = SelectionIndices::new(&outer);
        let outer_coords = outer.next();
        Ok(Self {
            outer,
            inner_runs: selection.inner_runs(),
            inner_cursor: 0,
            outer_coords,
            array_shape: array_shape.to_vec(),
        })
    }
}

impl Iterator for ContiguousLinearisedIndices {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let outer_coords = self.outer_coords.as_ref()?;
            if self.inner_cursor < self.inner_runs.len() {
                let (inner_start, len) = self.inner_runs[self.inner_cursor];
                self.inner_cursor += 1;
                let mut coords = outer_coords.clone();
                coords.push(inner_start);
                return Some((ravel_indices(&coords, &self.array_shape), len));
            }
            self.inner_cursor = 0;
            self.outer_coords = self.outer.next();
        }
    }
}

impl<T: IntoIterator<Item = Range<u64>>> From<T> for RawSelection {
    fn from(ranges: T) -> Self {
        let (start, count): (Vec<u64>, Vec<u64>) = ranges
            .into_iter()
            .map(|range| (range.start, range.end.saturating_sub(range.start)))
            .unzip();
        let rank = start.len();
        Self {
            start,
            stride: vec![1; rank],
            count,
            block: vec![1; rank],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_selection_shape() {
        let selection = RawSelection::new(vec![1, 2], vec![2, 1], vec![3, 4], vec![1, 1]).unwrap();
        assert_eq!(selection.shape(), vec![3, 4]);
        assert_eq!(selection.num_elements(), 12);
        assert_eq!(selection.end_exc(), vec![6, 6]);
        assert!(selection.inbounds_shape(&[6, 6]));
        assert!(!selection.inbounds_shape(&[6, 5]));
        assert!(!selection.inbounds_shape(&[6, 6, 6]));
    }

    #[test]
    fn raw_selection_invalid() {
        assert!(RawSelection::new(vec![0], vec![1, 1], vec![1], vec![1]).is_err());
        assert!(RawSelection::new(vec![0], vec![0], vec![1], vec![1]).is_err());
        assert!(RawSelection::new(vec![0], vec![1], vec![1], vec![0]).is_err());
    }

    #[test]
    fn raw_selection_empty() {
        let selection = RawSelection::new(vec![3], vec![1], vec![0], vec![1]).unwrap();
        assert!(selection.is_empty());
        assert_eq!(selection.num_elements(), 0);
        assert_eq!(selection.end_exc(), vec![3]);
        assert!(selection.inbounds_shape(&[3]));
        assert_eq!(selection.indices().count(), 0);
        assert_eq!(
            selection
                .contiguous_linearised_indices(&[3])
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn selection_indices() {
        let selection = RawSelection::from([2..4, 1..3]);
        let indices: Vec<_> = selection.indices().collect();
        assert_eq!(
            indices,
            vec![vec![2, 1], vec![2, 2], vec![3, 1], vec![3, 2]]
        );
    }

    #[test]
    fn strided_block_indices() {
        // 2 blocks of 2, stride 3: positions 0 1 3 4
        let selection = RawSelection::new(vec![0], vec![3], vec![2], vec![2]).unwrap();
        let positions: Vec<_> = selection.indices().map(|coords| coords[0]).collect();
        assert_eq!(positions, vec![0, 1, 3, 4]);
    }

    #[test]
    fn contiguous_runs_merge_when_dense() {
        // stride == block: one run per outer row
        let selection = RawSelection::new(
            vec![1, 1],
            vec![1, 2],
            vec![2, 2],
            vec![1, 2],
        )
        .unwrap();
        let runs: Vec<_> = selection
            .contiguous_linearised_indices(&[4, 6])
            .unwrap()
            .collect();
        assert_eq!(runs, vec![(7, 4), (13, 4)]);
    }

    #[test]
    fn contiguous_runs_lower_right() {
        // lower right 2x2 of a 4x3 array
        let selection = RawSelection::from([2..4, 1..3]);
        let runs: Vec<_> = selection
            .contiguous_linearised_indices(&[4, 3])
            .unwrap()
            .collect();
        assert_eq!(runs, vec![(7, 2), (10, 2)]);
    }

    #[test]
    fn contiguous_runs_out_of_bounds() {
        let selection = RawSelection::from([0..5]);
        assert!(selection.contiguous_linearised_indices(&[4]).is_err());
    }

    #[test]
    fn ravel() {
        assert_eq!(ravel_indices(&[3, 1], &[4, 3]), 10);
        assert_eq!(ravel_indices(&[], &[]), 0);
    }
}
