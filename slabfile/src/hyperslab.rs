//! Hyperslab index expressions and selections.
//!
//! A [`SlabIndex`] is one per-dimension index expression: a single index, a
//! half-open span, an open-ended span, or an explicit
//! `(start, stride, count, block)` hyperslab. [`Selection::resolve`] turns an
//! ordered list of expressions into a [`Selection`]: one resolved
//! [`Hyperslab`] per dimension of the target extent, with open ends resolved
//! against the dimension size and every tuple checked against the bounds
//! invariant.
//!
//! The [`slab!`](crate::slab) macro builds expression lists from ranges and
//! integers.

use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};

use thiserror::Error;

use crate::extent::IncompatibleRankError;
use crate::storage::RawSelection;

/// A per-dimension index expression.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SlabIndex {
    /// A single index.
    Single(u64),
    /// A half-open span `[start, end)`.
    Span(u64, u64),
    /// Everything from an index through the end of the dimension.
    From(u64),
    /// An explicit hyperslab: `count` blocks of `block` consecutive elements,
    /// block starts `stride` apart, the first at `start`.
    Slab {
        /// The index of the first element.
        start: u64,
        /// The distance between block starts.
        stride: u64,
        /// The number of blocks.
        count: u64,
        /// The number of consecutive elements per block.
        block: u64,
    },
}

impl SlabIndex {
    /// Resolve this expression against a dimension of size `dim`.
    ///
    /// # Errors
    /// Returns [`InvalidRangeError`] if the expression is malformed or the
    /// resolved hyperslab does not fit within the dimension.
    pub fn resolve(&self, dim: u64) -> Result<Hyperslab, InvalidRangeError> {
        let slab = match *self {
            Self::Single(index) => Hyperslab {
                start: index,
                stride: 1,
                count: 1,
                block: 1,
            },
            Self::Span(start, end) => {
                if end < start {
                    return Err(InvalidRangeError::ReversedSpan { start, end });
                }
                Hyperslab {
                    start,
                    stride: 1,
                    count: end - start,
                    block: 1,
                }
            }
            Self::From(start) => {
                let count = dim
                    .checked_sub(start)
                    .ok_or(InvalidRangeError::OutOfDimension {
                        expression: *self,
                        dim,
                    })?;
                Hyperslab {
                    start,
                    stride: 1,
                    count,
                    block: 1,
                }
            }
            Self::Slab {
                start,
                stride,
                count,
                block,
            } => Hyperslab::new(start, stride, count, block)?,
        };
        if slab.fits(dim) {
            Ok(slab)
        } else {
            Err(InvalidRangeError::OutOfDimension {
                expression: *self,
                dim,
            })
        }
    }
}

impl From<u64> for SlabIndex {
    fn from(index: u64) -> Self {
        Self::Single(index)
    }
}

impl From<Range<u64>> for SlabIndex {
    fn from(range: Range<u64>) -> Self {
        Self::Span(range.start, range.end)
    }
}

impl From<RangeInclusive<u64>> for SlabIndex {
    fn from(range: RangeInclusive<u64>) -> Self {
        Self::Span(*range.start(), *range.end() + 1)
    }
}

impl From<RangeFrom<u64>> for SlabIndex {
    fn from(range: RangeFrom<u64>) -> Self {
        Self::From(range.start)
    }
}

impl From<RangeTo<u64>> for SlabIndex {
    fn from(range: RangeTo<u64>) -> Self {
        Self::Span(0, range.end)
    }
}

impl From<RangeToInclusive<u64>> for SlabIndex {
    fn from(range: RangeToInclusive<u64>) -> Self {
        Self::Span(0, range.end + 1)
    }
}

impl From<RangeFull> for SlabIndex {
    fn from(_: RangeFull) -> Self {
        Self::From(0)
    }
}

impl From<(u64, u64, u64, u64)> for SlabIndex {
    fn from((start, stride, count, block): (u64, u64, u64, u64)) -> Self {
        Self::Slab {
            start,
            stride,
            count,
            block,
        }
    }
}

/// Build a `Vec<SlabIndex>` from index expressions.
///
/// Accepts anything convertible into a [`SlabIndex`](crate::hyperslab::SlabIndex):
/// integers, `a..b`, `a..=b`, `a..`, `..b`, `..`, and
/// `(start, stride, count, block)` tuples.
///
/// ```
/// # use slabfile::slab;
/// let slices = slab![1.., 0..2, 4];
/// ```
#[macro_export]
macro_rules! slab {
    ($($index:expr),* $(,)?) => {
        vec![$($crate::hyperslab::SlabIndex::from($index)),*]
    };
}

/// An invalid index expression or selection range.
#[derive(Clone, Debug, Error)]
pub enum InvalidRangeError {
    /// A span whose end is before its start.
    #[error("span end {end} is before span start {start}")]
    ReversedSpan {
        /// The span start.
        start: u64,
        /// The span end.
        end: u64,
    },
    /// A hyperslab with a zero stride or block.
    #[error("hyperslab stride and block must be at least 1")]
    ZeroStrideOrBlock,
    /// An expression that escapes its dimension.
    #[error("index expression {expression:?} exceeds a dimension of size {dim}")]
    OutOfDimension {
        /// The offending expression.
        expression: SlabIndex,
        /// The dimension size.
        dim: u64,
    },
    /// A selection offset that would take a start below zero.
    #[error("offset {delta} takes the selection start {start} below zero on axis {axis}")]
    NegativeStart {
        /// The offset axis.
        axis: usize,
        /// The selection start on the axis.
        start: u64,
        /// The offset delta.
        delta: i64,
    },
}

/// A selection error.
#[derive(Clone, Debug, Error)]
pub enum SelectionError {
    /// More index expressions than the extent has dimensions.
    #[error(transparent)]
    RankMismatch(#[from] IncompatibleRankError),
    /// An invalid index expression or selection range.
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
}

/// One resolved selection dimension.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Hyperslab {
    start: u64,
    stride: u64,
    count: u64,
    block: u64,
}

impl Hyperslab {
    /// Create a hyperslab.
    ///
    /// # Errors
    /// Returns [`InvalidRangeError::ZeroStrideOrBlock`] if `stride` or
    /// `block` is zero.
    pub fn new(start: u64, stride: u64, count: u64, block: u64) -> Result<Self, InvalidRangeError> {
        if stride == 0 || block == 0 {
            return Err(InvalidRangeError::ZeroStrideOrBlock);
        }
        Ok(Self {
            start,
            stride,
            count,
            block,
        })
    }

    /// The index of the first selected element.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// The distance between block starts.
    #[must_use]
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    /// The number of blocks.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// The number of consecutive elements per block.
    #[must_use]
    pub const fn block(&self) -> u64 {
        self.block
    }

    /// The number of selected elements: `count * block`.
    #[must_use]
    pub const fn num_elements(&self) -> u64 {
        self.count * self.block
    }

    /// The exclusive end of the selection, or [`None`] on overflow.
    ///
    /// For an empty hyperslab the end equals its start.
    #[must_use]
    pub fn end_exc(&self) -> Option<u64> {
        if self.count == 0 {
            Some(self.start)
        } else {
            (self.count - 1)
                .checked_mul(self.stride)?
                .checked_add(self.start)?
                .checked_add(self.block)
        }
    }

    /// Returns true if the selection fits within a dimension of size `dim`.
    #[must_use]
    pub fn fits(&self, dim: u64) -> bool {
        self.end_exc().is_some_and(|end| end <= dim)
    }
}

/// A resolved hyperslab selection: one [`Hyperslab`] per dimension of the
/// extent it selects within.
///
/// Dereferences to its per-dimension hyperslabs.
#[derive(Clone, Debug, Eq, PartialEq, Hash, derive_more::Deref)]
pub struct Selection {
    #[deref]
    slabs: Vec<Hyperslab>,
}

impl Selection {
    /// Create a selection covering the whole of an extent with `dims`.
    #[must_use]
    pub fn all(dims: &[u64]) -> Self {
        Self {
            slabs: dims
                .iter()
                .map(|&dim| Hyperslab {
                    start: 0,
                    stride: 1,
                    count: dim,
                    block: 1,
                })
                .collect(),
        }
    }

    /// Create a selection of no elements with the given rank.
    #[must_use]
    pub fn none(rank: usize) -> Self {
        Self {
            slabs: vec![
                Hyperslab {
                    start: 0,
                    stride: 1,
                    count: 0,
                    block: 1,
                };
                rank
            ],
        }
    }

    /// Resolve an ordered list of index expressions against an extent with
    /// `dims`.
    ///
    /// Dimensions beyond `expressions.len()` default to select-all.
    ///
    /// # Errors
    /// Returns [`SelectionError::RankMismatch`] if there are more expressions
    /// than dimensions, or [`SelectionError::InvalidRange`] if an expression
    /// is malformed or escapes its dimension.
    pub fn resolve(dims: &[u64], expressions: &[SlabIndex]) -> Result<Self, SelectionError> {
        if expressions.len() > dims.len() {
            return Err(IncompatibleRankError::new(expressions.len(), dims.len()).into());
        }
        let mut slabs = Vec::with_capacity(dims.len());
        for (expression, &dim) in std::iter::zip(expressions, dims) {
            slabs.push(expression.resolve(dim)?);
        }
        for &dim in &dims[expressions.len()..] {
            slabs.push(Hyperslab {
                start: 0,
                stride: 1,
                count: dim,
                block: 1,
            });
        }
        Ok(Self { slabs })
    }

    /// Return the resolved hyperslab of each dimension.
    #[must_use]
    pub fn slabs(&self) -> &[Hyperslab] {
        &self.slabs
    }

    /// Return the dimensionality of the selection.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.slabs.len()
    }

    /// Return the selection extent: per dimension, the number of selected
    /// elements.
    #[must_use]
    pub fn shape(&self) -> Vec<u64> {
        self.slabs.iter().map(Hyperslab::num_elements).collect()
    }

    /// Return the number of selected elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.slabs.iter().map(Hyperslab::num_elements).product()
    }

    /// Returns true if no elements are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slabs.iter().any(|slab| slab.num_elements() == 0)
    }

    /// Check that the selection fits within an extent with `dims`.
    ///
    /// # Errors
    /// Returns [`SelectionError::RankMismatch`] if the ranks differ, or
    /// [`SelectionError::InvalidRange`] naming the first escaping dimension.
    pub fn validate_within(&self, dims: &[u64]) -> Result<(), SelectionError> {
        if self.rank() != dims.len() {
            return Err(IncompatibleRankError::new(self.rank(), dims.len()).into());
        }
        for (slab, &dim) in std::iter::zip(&self.slabs, dims) {
            if !slab.fits(dim) {
                return Err(InvalidRangeError::OutOfDimension {
                    expression: SlabIndex::Slab {
                        start: slab.start,
                        stride: slab.stride,
                        count: slab.count,
                        block: slab.block,
                    },
                    dim,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Translate the selection's starts by `deltas` without changing its
    /// shape.
    ///
    /// The translated selection is not revalidated against any extent; that
    /// happens at the next read or write.
    ///
    /// # Errors
    /// Returns [`SelectionError::RankMismatch`] if the ranks differ, or
    /// [`SelectionError::InvalidRange`] if a start would go below zero.
    pub fn offset_by(&mut self, deltas: &[i64]) -> Result<(), SelectionError> {
        if deltas.len() != self.rank() {
            return Err(IncompatibleRankError::new(deltas.len(), self.rank()).into());
        }
        let starts = std::iter::zip(&self.slabs, deltas)
            .enumerate()
            .map(|(axis, (slab, &delta))| {
                slab.start
                    .checked_add_signed(delta)
                    .ok_or(InvalidRangeError::NegativeStart {
                        axis,
                        start: slab.start,
                        delta,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (slab, start) in std::iter::zip(&mut self.slabs, starts) {
            slab.start = start;
        }
        Ok(())
    }

    /// Return the canonical form passed to the storage runtime.
    #[must_use]
    pub fn to_raw(&self) -> RawSelection {
        RawSelection::new(
            self.slabs.iter().map(|slab| slab.start).collect(),
            self.slabs.iter().map(|slab| slab.stride).collect(),
            self.slabs.iter().map(|slab| slab.count).collect(),
            self.slabs.iter().map(|slab| slab.block).collect(),
        )
        .expect("hyperslab stride and block are nonzero")
    }
}
