//! Native datatype descriptors.
//!
//! A [`Datatype`] describes the on-the-wire encoding of a dataset's elements:
//! an element kind ([`NativeKind`]) and a byte-order tag ([`ByteOrder`]).
//! The byte-order tag is carried through transfers unchanged; this layer never
//! swaps bytes.

use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;

/// The native element kind of a dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NativeKind {
    /// 64-bit IEEE 754 floating point.
    Float64,
    /// 32-bit IEEE 754 floating point.
    Float32,
    /// 64-bit signed integer.
    Int64,
    /// Fixed-length string: `len` bytes per record, null padded.
    FixedString {
        /// The record width in bytes.
        len: NonZeroUsize,
    },
    /// Variable-length string: one independent null-terminated buffer per element.
    VariableString,
}

impl NativeKind {
    /// Return the fixed size in bytes of one element.
    ///
    /// Returns [`None`] for [`NativeKind::VariableString`].
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            Self::Float64 | Self::Int64 => Some(8),
            Self::Float32 => Some(4),
            Self::FixedString { len } => Some(len.get()),
            Self::VariableString => None,
        }
    }

    /// Returns true if elements of this kind have a variable-length encoding.
    #[must_use]
    pub const fn is_variable_length(&self) -> bool {
        matches!(self, Self::VariableString)
    }
}

impl Display for NativeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float64 => write!(f, "float64"),
            Self::Float32 => write!(f, "float32"),
            Self::Int64 => write!(f, "int64"),
            Self::FixedString { len } => write!(f, "string{len}"),
            Self::VariableString => write!(f, "string"),
        }
    }
}

/// The byte order of a fixed-width datatype.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ByteOrder {
    /// Least-significant byte first.
    LittleEndian,
    /// Most-significant byte first.
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LittleEndian;
    /// The byte order of the host.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BigEndian;

    /// Returns true if this byte order matches the host byte order.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self == &Self::NATIVE
    }
}

impl Display for ByteOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LittleEndian => write!(f, "little-endian"),
            Self::BigEndian => write!(f, "big-endian"),
        }
    }
}

/// A native datatype: an element kind plus a byte-order tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Datatype {
    kind: NativeKind,
    order: ByteOrder,
}

impl Datatype {
    /// Create a datatype with the host byte order.
    #[must_use]
    pub const fn new(kind: NativeKind) -> Self {
        Self {
            kind,
            order: ByteOrder::NATIVE,
        }
    }

    /// A 64-bit float datatype with the host byte order.
    #[must_use]
    pub const fn float64() -> Self {
        Self::new(NativeKind::Float64)
    }

    /// A 32-bit float datatype with the host byte order.
    #[must_use]
    pub const fn float32() -> Self {
        Self::new(NativeKind::Float32)
    }

    /// A 64-bit signed integer datatype with the host byte order.
    #[must_use]
    pub const fn int64() -> Self {
        Self::new(NativeKind::Int64)
    }

    /// A fixed-length string datatype with `len` bytes per record.
    #[must_use]
    pub const fn fixed_string(len: NonZeroUsize) -> Self {
        Self::new(NativeKind::FixedString { len })
    }

    /// A variable-length string datatype.
    #[must_use]
    pub const fn variable_string() -> Self {
        Self::new(NativeKind::VariableString)
    }

    /// Return the element kind.
    #[must_use]
    pub const fn kind(&self) -> NativeKind {
        self.kind
    }

    /// Return the byte-order tag.
    #[must_use]
    pub const fn order(&self) -> ByteOrder {
        self.order
    }

    /// Set the byte-order tag.
    ///
    /// The tag is passed through to the storage runtime unchanged; transfers
    /// do not swap bytes.
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Return this datatype with the byte-order tag replaced.
    #[must_use]
    pub const fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Return the fixed size in bytes of one element.
    ///
    /// Returns [`None`] for variable-length kinds.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        self.kind.size()
    }

    /// Returns true if elements have a variable-length encoding.
    #[must_use]
    pub const fn is_variable_length(&self) -> bool {
        self.kind.is_variable_length()
    }
}

impl Display for Datatype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.kind, self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_sizes() {
        assert_eq!(Datatype::float64().size(), Some(8));
        assert_eq!(Datatype::float32().size(), Some(4));
        assert_eq!(Datatype::int64().size(), Some(8));
        assert_eq!(
            Datatype::fixed_string(NonZeroUsize::new(12).unwrap()).size(),
            Some(12)
        );
        assert_eq!(Datatype::variable_string().size(), None);
        assert!(Datatype::variable_string().is_variable_length());
        assert!(!Datatype::int64().is_variable_length());
    }

    #[test]
    fn byte_order_tag() {
        let mut datatype = Datatype::float64();
        assert!(datatype.order().is_native());
        datatype.set_order(ByteOrder::BigEndian);
        assert_eq!(datatype.order(), ByteOrder::BigEndian);
        let little = datatype.with_order(ByteOrder::LittleEndian);
        assert_eq!(little.order(), ByteOrder::LittleEndian);
    }
}
