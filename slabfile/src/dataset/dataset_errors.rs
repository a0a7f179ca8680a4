use thiserror::Error;

use crate::extent::ExtentError;
use crate::hyperslab::SelectionError;
use crate::storage::{Datatype, StorageError};

/// A dataset error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// A selection error.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// An extent error.
    #[error(transparent)]
    Extent(#[from] ExtentError),
    /// The two sides of a transfer, or a buffer and its selection, disagree
    /// in size.
    #[error("shape mismatch: got {got} elements, expected {expected}")]
    ShapeMismatch {
        /// The number of elements supplied.
        got: u64,
        /// The number of elements the selection requires.
        expected: u64,
    },
    /// The dataset was not created with room to grow on an axis.
    #[error("the dataset extent is fixed on axis {axis}")]
    ExtentFixed {
        /// The violating axis.
        axis: usize,
    },
    /// The host element type does not match the dataset's datatype.
    #[error("datatype {datatype} cannot be read or written as {requested}")]
    UnknownDataType {
        /// The dataset's datatype.
        datatype: Datatype,
        /// The host element type.
        requested: &'static str,
    },
    /// An element value the declared encoding cannot represent.
    #[error("invalid element value: {_0}")]
    InvalidElementValue(String),
    /// A transfer moved an unexpected number of bytes.
    #[error("transfer of {got} bytes is not a whole number of {element_size}-byte elements")]
    UnexpectedTransferSize {
        /// The number of bytes transferred.
        got: usize,
        /// The element size.
        element_size: usize,
    },
    /// An axis beyond the dataset rank.
    #[error("axis {axis} exceeds dataset rank {rank}")]
    InvalidAxis {
        /// The requested axis.
        axis: usize,
        /// The dataset rank.
        rank: usize,
    },
    /// The storage runtime reported a failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DatasetError {
    /// Map extent-change failures onto the growth contract: a fixed axis
    /// surfaces as [`DatasetError::ExtentFixed`].
    pub(crate) fn from_extent_change(err: ExtentError) -> Self {
        match err {
            ExtentError::FixedAxis { axis } => Self::ExtentFixed { axis },
            err @ (ExtentError::IncompatibleRank(_) | ExtentError::InvalidMaxExtent(_)) => {
                Self::Extent(err)
            }
        }
    }
}
