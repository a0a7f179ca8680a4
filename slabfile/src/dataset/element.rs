//! Element encoding and decoding.
//!
//! An [`Element`] is a host type that can be written to a dataset; an
//! [`ElementOwned`] can also be read back. Conversions are parameterised by
//! the dataset's [`Datatype`], so one host type can serve several native
//! encodings (e.g. [`String`] serves both fixed- and variable-length
//! strings). A kind mismatch is always an error; bytes are never
//! reinterpreted across kinds.

use std::borrow::Cow;

use crate::storage::{Datatype, NativeKind};

use super::DatasetError;

/// The on-the-wire form of a run of elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementBytes<'a> {
    /// Fixed-width elements in a flat buffer.
    Fixed(Cow<'a, [u8]>),
    /// Variable-length elements: one independently owned, null-terminated
    /// run per element.
    Variable(Vec<Vec<u8>>),
}

/// A host element type that can be written to a dataset.
pub trait Element: Sized + Clone {
    /// The datatype a dataset of this element type is created with by
    /// default.
    #[must_use]
    fn default_datatype() -> Datatype;

    /// Check that `datatype` can hold elements of this type.
    ///
    /// # Errors
    /// Returns [`DatasetError::UnknownDataType`] on a kind mismatch.
    fn validate_datatype(datatype: &Datatype) -> Result<(), DatasetError>;

    /// Convert a slice of elements into their on-the-wire form.
    ///
    /// All elements are fully materialised before any native call is issued.
    ///
    /// # Errors
    /// Returns [`DatasetError::UnknownDataType`] on a kind mismatch or
    /// [`DatasetError::InvalidElementValue`] for a value the encoding cannot
    /// represent.
    fn encode<'a>(
        datatype: &Datatype,
        elements: &'a [Self],
    ) -> Result<ElementBytes<'a>, DatasetError>;
}

/// A host element type that can be read from a dataset.
pub trait ElementOwned: Element {
    /// Convert an on-the-wire run of elements into owned host values.
    ///
    /// Variable-length runs transfer ownership: every element is decoded
    /// into an owned value before the runs are dropped.
    ///
    /// # Errors
    /// Returns [`DatasetError::UnknownDataType`] on a kind mismatch or
    /// [`DatasetError::InvalidElementValue`] for undecodable content.
    fn decode(datatype: &Datatype, bytes: ElementBytes<'_>) -> Result<Vec<Self>, DatasetError>;
}

macro_rules! impl_fixed_element {
    ($element:ty, $kind:expr, $name:literal) => {
        impl Element for $element {
            fn default_datatype() -> Datatype {
                Datatype::new($kind)
            }

            fn validate_datatype(datatype: &Datatype) -> Result<(), DatasetError> {
                if datatype.kind() == $kind {
                    Ok(())
                } else {
                    Err(DatasetError::UnknownDataType {
                        datatype: *datatype,
                        requested: $name,
                    })
                }
            }

            fn encode<'a>(
                datatype: &Datatype,
                elements: &'a [Self],
            ) -> Result<ElementBytes<'a>, DatasetError> {
                Self::validate_datatype(datatype)?;
                Ok(ElementBytes::Fixed(Cow::Borrowed(bytemuck::cast_slice(
                    elements,
                ))))
            }
        }

        impl ElementOwned for $element {
            fn decode(
                datatype: &Datatype,
                bytes: ElementBytes<'_>,
            ) -> Result<Vec<Self>, DatasetError> {
                Self::validate_datatype(datatype)?;
                match bytes {
                    ElementBytes::Fixed(bytes) => {
                        let element_size = std::mem::size_of::<Self>();
                        if bytes.len() % element_size != 0 {
                            return Err(DatasetError::UnexpectedTransferSize {
                                got: bytes.len(),
                                element_size,
                            });
                        }
                        Ok(bytemuck::pod_collect_to_vec(&bytes))
                    }
                    ElementBytes::Variable(_) => Err(DatasetError::UnknownDataType {
                        datatype: *datatype,
                        requested: $name,
                    }),
                }
            }
        }
    };
}

impl_fixed_element!(f64, NativeKind::Float64, "f64");
impl_fixed_element!(f32, NativeKind::Float32, "f32");
impl_fixed_element!(i64, NativeKind::Int64, "i64");

impl Element for String {
    fn default_datatype() -> Datatype {
        Datatype::variable_string()
    }

    fn validate_datatype(datatype: &Datatype) -> Result<(), DatasetError> {
        match datatype.kind() {
            NativeKind::FixedString { .. } | NativeKind::VariableString => Ok(()),
            NativeKind::Float64 | NativeKind::Float32 | NativeKind::Int64 => {
                Err(DatasetError::UnknownDataType {
                    datatype: *datatype,
                    requested: "String",
                })
            }
        }
    }

    fn encode<'a>(
        datatype: &Datatype,
        elements: &'a [Self],
    ) -> Result<ElementBytes<'a>, DatasetError> {
        match datatype.kind() {
            NativeKind::VariableString => {
                let mut runs = Vec::with_capacity(elements.len());
                for element in elements {
                    reject_interior_nul(element)?;
                    let mut run = Vec::with_capacity(element.len() + 1);
                    run.extend_from_slice(element.as_bytes());
                    run.push(0);
                    runs.push(run);
                }
                Ok(ElementBytes::Variable(runs))
            }
            NativeKind::FixedString { len } => {
                let len = len.get();
                let mut records = vec![0u8; elements.len() * len];
                for (record, element) in std::iter::zip(records.chunks_exact_mut(len), elements) {
                    reject_interior_nul(element)?;
                    let bytes = element.as_bytes();
                    if bytes.len() > len {
                        return Err(DatasetError::InvalidElementValue(format!(
                            "string of {} bytes exceeds the record width {len}",
                            bytes.len()
                        )));
                    }
                    record[..bytes.len()].copy_from_slice(bytes);
                }
                Ok(ElementBytes::Fixed(Cow::Owned(records)))
            }
            NativeKind::Float64 | NativeKind::Float32 | NativeKind::Int64 => {
                Err(DatasetError::UnknownDataType {
                    datatype: *datatype,
                    requested: "String",
                })
            }
        }
    }
}

impl ElementOwned for String {
    fn decode(datatype: &Datatype, bytes: ElementBytes<'_>) -> Result<Vec<Self>, DatasetError> {
        match (datatype.kind(), bytes) {
            (NativeKind::VariableString, ElementBytes::Variable(runs)) => runs
                .into_iter()
                .map(|run| {
                    let end = run.iter().position(|&byte| byte == 0).unwrap_or(run.len());
                    string_from_bytes(&run[..end])
                })
                .collect(),
            (NativeKind::FixedString { len }, ElementBytes::Fixed(records)) => {
                let len = len.get();
                if records.len() % len != 0 {
                    return Err(DatasetError::UnexpectedTransferSize {
                        got: records.len(),
                        element_size: len,
                    });
                }
                records
                    .chunks_exact(len)
                    .map(|record| {
                        // a record with no trailing null occupies the whole slot
                        let end = record
                            .iter()
                            .position(|&byte| byte == 0)
                            .unwrap_or(len);
                        string_from_bytes(&record[..end])
                    })
                    .collect()
            }
            (_, _) => Err(DatasetError::UnknownDataType {
                datatype: *datatype,
                requested: "String",
            }),
        }
    }
}

fn reject_interior_nul(element: &str) -> Result<(), DatasetError> {
    if element.as_bytes().contains(&0) {
        Err(DatasetError::InvalidElementValue(format!(
            "string contains an interior NUL: {element:?}"
        )))
    } else {
        Ok(())
    }
}

fn string_from_bytes(bytes: &[u8]) -> Result<String, DatasetError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|err| DatasetError::InvalidElementValue(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    #[test]
    fn fixed_elements_reinterpret() {
        let values = [0.5f64, -1.0, 2.25];
        let bytes = f64::encode(&Datatype::float64(), &values).unwrap();
        let ElementBytes::Fixed(bytes) = &bytes else {
            panic!("expected fixed bytes");
        };
        assert_eq!(bytes.len(), 24);
        let decoded = f64::decode(&Datatype::float64(), ElementBytes::Fixed(bytes.clone())).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        assert!(matches!(
            f64::encode(&Datatype::float32(), &[1.0]),
            Err(DatasetError::UnknownDataType { .. })
        ));
        assert!(matches!(
            i64::validate_datatype(&Datatype::variable_string()),
            Err(DatasetError::UnknownDataType { .. })
        ));
        assert!(matches!(
            String::validate_datatype(&Datatype::int64()),
            Err(DatasetError::UnknownDataType { .. })
        ));
    }

    #[test]
    fn ragged_transfer_is_an_error() {
        assert!(matches!(
            f64::decode(
                &Datatype::float64(),
                ElementBytes::Fixed(Cow::Borrowed(&[0u8; 12]))
            ),
            Err(DatasetError::UnexpectedTransferSize { .. })
        ));
    }

    #[test]
    fn variable_strings_round_trip() {
        let values = ["hello".to_string(), String::new(), "world".to_string()];
        let datatype = Datatype::variable_string();
        let bytes = String::encode(&datatype, &values).unwrap();
        let ElementBytes::Variable(runs) = &bytes else {
            panic!("expected variable runs");
        };
        assert_eq!(runs[0], b"hello\0");
        assert_eq!(runs[1], b"\0");
        let decoded = String::decode(&datatype, bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn interior_nul_is_rejected() {
        let values = ["a\0b".to_string()];
        assert!(matches!(
            String::encode(&Datatype::variable_string(), &values),
            Err(DatasetError::InvalidElementValue(_))
        ));
    }

    #[test]
    fn fixed_strings_pad_and_bound() {
        let datatype = Datatype::fixed_string(NonZeroUsize::new(4).unwrap());
        let values = ["ab".to_string(), "wxyz".to_string()];
        let bytes = String::encode(&datatype, &values).unwrap();
        let ElementBytes::Fixed(records) = &bytes else {
            panic!("expected fixed records");
        };
        // "ab" is null padded; "wxyz" fills its slot with no trailing null
        assert_eq!(&records[..], b"ab\0\0wxyz");
        let decoded = String::decode(&datatype, bytes).unwrap();
        assert_eq!(decoded, values);

        assert!(matches!(
            String::encode(&datatype, &["toolong".to_string()]),
            Err(DatasetError::InvalidElementValue(_))
        ));
    }
}
