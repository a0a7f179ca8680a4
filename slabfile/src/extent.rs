//! Array extents.
//!
//! An [`Extent`] is the per-dimension size vector of an N-dimensional array,
//! optionally paired with a maximum extent for resizable axes.

use thiserror::Error;

use crate::storage::MaxDims;

/// The maximum size of one axis of a resizable extent.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MaxDim {
    /// The axis can grow up to this size.
    Bounded(u64),
    /// The axis can grow without bound.
    Unlimited,
}

impl From<Option<u64>> for MaxDim {
    fn from(max: Option<u64>) -> Self {
        max.map_or(Self::Unlimited, Self::Bounded)
    }
}

impl From<MaxDim> for Option<u64> {
    fn from(max: MaxDim) -> Self {
        match max {
            MaxDim::Bounded(max) => Some(max),
            MaxDim::Unlimited => None,
        }
    }
}

/// An incompatible rank error.
#[derive(Copy, Clone, Debug, Error)]
#[error("incompatible rank {_0}, expected {_1}")]
pub struct IncompatibleRankError(usize, usize);

impl IncompatibleRankError {
    /// Create a new incompatible rank error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}

/// An invalid maximum extent error.
#[derive(Clone, Debug, Error)]
#[error("maximum extent component {max} on axis {axis} is less than the extent component {dim}")]
pub struct InvalidMaxExtentError {
    axis: usize,
    dim: u64,
    max: u64,
}

/// An extent error.
#[derive(Clone, Debug, Error)]
pub enum ExtentError {
    /// Incompatible rank.
    #[error(transparent)]
    IncompatibleRank(#[from] IncompatibleRankError),
    /// A maximum extent component is below the extent.
    #[error(transparent)]
    InvalidMaxExtent(#[from] InvalidMaxExtentError),
    /// The extent cannot change on an axis.
    #[error("the extent is fixed on axis {axis}")]
    FixedAxis {
        /// The violating axis.
        axis: usize,
    },
}

/// The shape of an N-dimensional array: one size per dimension, plus an
/// optional maximum extent for resizable axes.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Extent {
    dims: Vec<u64>,
    max_dims: Option<Vec<MaxDim>>,
}

impl Extent {
    /// Create a fixed extent.
    #[must_use]
    pub fn new(dims: Vec<u64>) -> Self {
        Self {
            dims,
            max_dims: None,
        }
    }

    /// Create a resizable extent.
    ///
    /// Each component of `max_dims` bounds later growth of the corresponding
    /// axis; [`MaxDim::Unlimited`] axes can grow without bound.
    ///
    /// # Errors
    /// Returns [`ExtentError`] if the ranks differ or a bounded maximum is
    /// below the current size.
    pub fn new_bounded(dims: Vec<u64>, max_dims: Vec<MaxDim>) -> Result<Self, ExtentError> {
        if dims.len() != max_dims.len() {
            return Err(IncompatibleRankError::new(max_dims.len(), dims.len()).into());
        }
        for (axis, (&dim, &max)) in std::iter::zip(&dims, &max_dims).enumerate() {
            if let MaxDim::Bounded(max) = max {
                if max < dim {
                    return Err(InvalidMaxExtentError { axis, dim, max }.into());
                }
            }
        }
        Ok(Self {
            dims,
            max_dims: Some(max_dims),
        })
    }

    /// Return the size of each dimension.
    #[must_use]
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    /// Return the maximum size of each dimension, if the extent is resizable.
    #[must_use]
    pub fn max_dims(&self) -> Option<&[MaxDim]> {
        self.max_dims.as_deref()
    }

    /// Return the number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns true if the extent was created with room to change.
    #[must_use]
    pub fn is_resizable(&self) -> bool {
        self.max_dims.is_some()
    }

    /// Return the total number of elements.
    ///
    /// Equal to the product of the components of [`Extent::dims`]; the empty
    /// product of a rank 0 extent is 1.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.dims.iter().product()
    }

    /// Return the total number of elements as a `usize`.
    ///
    /// # Panics
    /// Panics if [`num_elements()`](Self::num_elements) exceeds
    /// [`usize::MAX`].
    #[must_use]
    pub fn num_elements_usize(&self) -> usize {
        usize::try_from(self.num_elements()).unwrap()
    }

    /// Returns true if the extent holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dims.iter().any(|&dim| dim == 0)
    }

    /// Check that the extent may change to `new_dims`.
    ///
    /// # Errors
    /// Returns [`ExtentError::FixedAxis`] if the extent is not resizable or a
    /// component of `new_dims` exceeds a bounded maximum;
    /// [`ExtentError::IncompatibleRank`] if the ranks differ.
    pub fn permits(&self, new_dims: &[u64]) -> Result<(), ExtentError> {
        if new_dims.len() != self.rank() {
            return Err(IncompatibleRankError::new(new_dims.len(), self.rank()).into());
        }
        let Some(max_dims) = &self.max_dims else {
            return match std::iter::zip(&self.dims, new_dims).position(|(old, new)| old != new) {
                Some(axis) => Err(ExtentError::FixedAxis { axis }),
                None => Ok(()),
            };
        };
        for (axis, (&new, &max)) in std::iter::zip(new_dims, max_dims).enumerate() {
            if let MaxDim::Bounded(max) = max {
                if new > max {
                    return Err(ExtentError::FixedAxis { axis });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn to_descriptor(&self) -> (Vec<u64>, Option<MaxDims>) {
        (
            self.dims.clone(),
            self.max_dims
                .as_ref()
                .map(|max_dims| max_dims.iter().map(|&max| max.into()).collect()),
        )
    }

    pub(crate) fn from_descriptor(dims: Vec<u64>, max_dims: Option<MaxDims>) -> Self {
        Self {
            dims,
            max_dims: max_dims
                .map(|max_dims| max_dims.into_iter().map(MaxDim::from).collect()),
        }
    }

    pub(crate) fn set_dims(&mut self, dims: Vec<u64>) {
        self.dims = dims;
    }
}

impl From<Vec<u64>> for Extent {
    fn from(dims: Vec<u64>) -> Self {
        Self::new(dims)
    }
}

impl From<&[u64]> for Extent {
    fn from(dims: &[u64]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_counts() {
        assert_eq!(Extent::new(vec![3, 4]).num_elements(), 12);
        assert_eq!(Extent::new(vec![]).num_elements(), 1);
        assert_eq!(Extent::new(vec![3, 0]).num_elements(), 0);
        assert!(Extent::new(vec![3, 0]).is_empty());
        assert_eq!(Extent::new(vec![3, 4]).rank(), 2);
    }

    #[test]
    fn bounded_extent() {
        let extent =
            Extent::new_bounded(vec![2, 2], vec![MaxDim::Unlimited, MaxDim::Bounded(4)]).unwrap();
        assert!(extent.is_resizable());
        assert!(extent.permits(&[100, 4]).is_ok());
        assert!(matches!(
            extent.permits(&[100, 5]),
            Err(ExtentError::FixedAxis { axis: 1 })
        ));
        assert!(extent.permits(&[1, 1]).is_ok());
        assert!(extent.permits(&[1, 1, 1]).is_err());

        assert!(Extent::new_bounded(vec![2], vec![MaxDim::Bounded(1)]).is_err());
        assert!(Extent::new_bounded(vec![2], vec![]).is_err());
    }

    #[test]
    fn fixed_extent_permits_no_change() {
        let extent = Extent::new(vec![2, 2]);
        assert!(extent.permits(&[2, 2]).is_ok());
        assert!(matches!(
            extent.permits(&[2, 3]),
            Err(ExtentError::FixedAxis { axis: 1 })
        ));
    }
}
