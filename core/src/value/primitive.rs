//! Primitive value container and conversions.

use crate::tag::Tag;
use num_traits::{NumCast, ToPrimitive};
use smallvec::SmallVec;
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;
use std::fmt;

/// Combined in-line value container for multi-valued attributes.
/// Most attributes carry one or two values,
/// so two slots are kept in-line before spilling to the heap.
pub type C<T> = SmallVec<[T; 2]>;

/// An error raised when requesting a primitive value
/// under an incompatible type.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ConvertValueError {
    /// The value variant cannot be read as the requested type.
    #[snafu(display("cannot convert {} value to {}", original, requested))]
    IncompatibleType {
        /// the name of the variant held
        original: &'static str,
        /// the requested type
        requested: &'static str,
        backtrace: Backtrace,
    },
    /// A string value failed to parse as the requested number.
    #[snafu(display("could not parse `{}` as {}", value, requested))]
    ParseNumber {
        value: String,
        requested: &'static str,
        backtrace: Backtrace,
    },
    /// A numeric value does not fit the requested type.
    #[snafu(display("value out of range of {}", requested))]
    NarrowConvert {
        requested: &'static str,
        backtrace: Backtrace,
    },
    /// The value is empty, but one value was required.
    #[snafu(display("value is empty"))]
    EmptyValue { backtrace: Backtrace },
}

type Result<T> = std::result::Result<T, ConvertValueError>;

/// An enum containing a DICOM primitive value,
/// in one of its supported in-memory forms.
///
/// String values keep their logical content only:
/// the trailing padding required on the wire is added at encoding time
/// and stripped at decoding time.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// No value; the element is present with zero length.
    Empty,
    /// One string value.
    Str(String),
    /// Multiple string values separated by backslash on the wire.
    Strs(C<String>),
    /// A list of attribute tags (VR `AT`).
    Tags(C<Tag>),
    /// Raw bytes (VRs OB, UN and friends).
    U8(C<u8>),
    /// Signed 16-bit slots.
    I16(C<i16>),
    /// Unsigned 16-bit slots (also OW payloads).
    U16(C<u16>),
    /// Signed 32-bit slots.
    I32(C<i32>),
    /// Unsigned 32-bit slots.
    U32(C<u32>),
    /// Signed 64-bit slots.
    I64(C<i64>),
    /// Unsigned 64-bit slots.
    U64(C<u64>),
    /// 32-bit floating point slots.
    F32(C<f32>),
    /// 64-bit floating point slots.
    F64(C<f64>),
}

impl PrimitiveValue {
    /// The variant name, for error reporting.
    pub fn variant_name(&self) -> &'static str {
        use PrimitiveValue::*;
        match self {
            Empty => "Empty",
            Str(_) => "Str",
            Strs(_) => "Strs",
            Tags(_) => "Tags",
            U8(_) => "U8",
            I16(_) => "I16",
            U16(_) => "U16",
            I32(_) => "I32",
            U32(_) => "U32",
            I64(_) => "I64",
            U64(_) => "U64",
            F32(_) => "F32",
            F64(_) => "F64",
        }
    }

    /// Whether the value holds nothing.
    pub fn is_empty(&self) -> bool {
        self.multiplicity() == 0
    }

    /// The number of individual values.
    pub fn multiplicity(&self) -> u32 {
        use PrimitiveValue::*;
        match self {
            Empty => 0,
            Str(s) => {
                if s.is_empty() {
                    0
                } else {
                    1
                }
            }
            Strs(v) => v.len() as u32,
            Tags(v) => v.len() as u32,
            U8(v) => v.len() as u32,
            I16(v) => v.len() as u32,
            U16(v) => v.len() as u32,
            I32(v) => v.len() as u32,
            U32(v) => v.len() as u32,
            I64(v) => v.len() as u32,
            U64(v) => v.len() as u32,
            F32(v) => v.len() as u32,
            F64(v) => v.len() as u32,
        }
    }

    /// The number of bytes the value occupies before even-length padding.
    ///
    /// String multi-values count one backslash separator between values.
    pub fn byte_len(&self) -> usize {
        use PrimitiveValue::*;
        match self {
            Empty => 0,
            Str(s) => s.len(),
            Strs(v) => v.iter().map(String::len).sum::<usize>() + v.len().saturating_sub(1),
            Tags(v) => v.len() * 4,
            U8(v) => v.len(),
            I16(v) => v.len() * 2,
            U16(v) => v.len() * 2,
            I32(v) => v.len() * 4,
            U32(v) => v.len() * 4,
            I64(v) => v.len() * 8,
            U64(v) => v.len() * 8,
            F32(v) => v.len() * 4,
            F64(v) => v.len() * 8,
        }
    }

    /// Render the value as a single string.
    /// Multiple values are joined with the backslash separator,
    /// numbers with their canonical decimal form.
    pub fn to_str(&self) -> Cow<str> {
        use PrimitiveValue::*;
        fn join<T: ToString>(v: &[T]) -> String {
            v.iter()
                .map(T::to_string)
                .collect::<Vec<_>>()
                .join("\\")
        }
        match self {
            Empty => Cow::from(""),
            Str(s) => Cow::from(s.as_str()),
            Strs(v) if v.len() == 1 => Cow::from(v[0].as_str()),
            Strs(v) => Cow::from(v.join("\\")),
            Tags(v) => Cow::from(join(v)),
            U8(v) => Cow::from(join(v)),
            I16(v) => Cow::from(join(v)),
            U16(v) => Cow::from(join(v)),
            I32(v) => Cow::from(join(v)),
            U32(v) => Cow::from(join(v)),
            I64(v) => Cow::from(join(v)),
            U64(v) => Cow::from(join(v)),
            F32(v) => Cow::from(join(v)),
            F64(v) => Cow::from(join(v)),
        }
    }

    /// Obtain the individual string values.
    pub fn to_multi_str(&self) -> Vec<String> {
        use PrimitiveValue::*;
        match self {
            Empty => Vec::new(),
            Str(s) => vec![s.clone()],
            Strs(v) => v.to_vec(),
            _ => self
                .to_str()
                .split('\\')
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Read the first value as an integer of the requested type.
    ///
    /// String values are parsed (VRs IS and DS carry numbers as text);
    /// numeric values are cast, failing on overflow.
    pub fn to_int<T>(&self) -> Result<T>
    where
        T: NumCast + std::str::FromStr,
    {
        use PrimitiveValue::*;
        let requested = std::any::type_name::<T>();
        match self {
            Empty => EmptyValueSnafu.fail(),
            Str(s) => s.trim().parse::<T>().ok().ok_or_else(|| {
                ParseNumberSnafu {
                    value: s.clone(),
                    requested,
                }
                .build()
            }),
            Strs(v) => {
                let s = v.first().ok_or_else(|| EmptyValueSnafu.build())?;
                s.trim().parse::<T>().ok().ok_or_else(|| {
                    ParseNumberSnafu {
                        value: s.clone(),
                        requested,
                    }
                    .build()
                })
            }
            U8(v) => cast_first(v, requested),
            I16(v) => cast_first(v, requested),
            U16(v) => cast_first(v, requested),
            I32(v) => cast_first(v, requested),
            U32(v) => cast_first(v, requested),
            I64(v) => cast_first(v, requested),
            U64(v) => cast_first(v, requested),
            F32(v) => cast_first(v, requested),
            F64(v) => cast_first(v, requested),
            Tags(_) => IncompatibleTypeSnafu {
                original: self.variant_name(),
                requested,
            }
            .fail(),
        }
    }

    /// Read all values as integers of the requested type.
    pub fn to_multi_int<T>(&self) -> Result<Vec<T>>
    where
        T: NumCast + std::str::FromStr,
    {
        use PrimitiveValue::*;
        let requested = std::any::type_name::<T>();
        match self {
            Empty => Ok(Vec::new()),
            Str(_) | Strs(_) => self
                .to_multi_str()
                .iter()
                .map(|s| {
                    s.trim().parse::<T>().ok().ok_or_else(|| {
                        ParseNumberSnafu {
                            value: s.clone(),
                            requested,
                        }
                        .build()
                    })
                })
                .collect(),
            U8(v) => cast_all(v, requested),
            I16(v) => cast_all(v, requested),
            U16(v) => cast_all(v, requested),
            I32(v) => cast_all(v, requested),
            U32(v) => cast_all(v, requested),
            I64(v) => cast_all(v, requested),
            U64(v) => cast_all(v, requested),
            F32(v) => cast_all(v, requested),
            F64(v) => cast_all(v, requested),
            Tags(_) => IncompatibleTypeSnafu {
                original: self.variant_name(),
                requested,
            }
            .fail(),
        }
    }

    /// Read the first value as a 64-bit float.
    pub fn to_f64(&self) -> Result<f64> {
        use PrimitiveValue::*;
        match self {
            F64(v) => v.first().copied().ok_or_else(|| EmptyValueSnafu.build()),
            F32(v) => v
                .first()
                .map(|v| <f64 as From<f32>>::from(*v))
                .ok_or_else(|| EmptyValueSnafu.build()),
            _ => self.to_int::<f64>(),
        }
    }

    /// Read all values as 64-bit floats.
    pub fn to_multi_f64(&self) -> Result<Vec<f64>> {
        use PrimitiveValue::*;
        match self {
            F64(v) => Ok(v.to_vec()),
            F32(v) => Ok(v.iter().map(|v| <f64 as From<f32>>::from(*v)).collect()),
            _ => self.to_multi_int::<f64>(),
        }
    }

    /// Borrow the raw bytes, for byte-grained values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PrimitiveValue::U8(v) => Some(v),
            _ => None,
        }
    }
}

fn cast_first<S, T>(v: &[S], requested: &'static str) -> Result<T>
where
    S: Copy + ToPrimitive,
    T: NumCast,
{
    let first = v.first().ok_or_else(|| EmptyValueSnafu.build())?;
    NumCast::from(*first).ok_or_else(|| NarrowConvertSnafu { requested }.build())
}

fn cast_all<S, T>(v: &[S], requested: &'static str) -> Result<Vec<T>>
where
    S: Copy + ToPrimitive,
    T: NumCast,
{
    v.iter()
        .map(|x| NumCast::from(*x).ok_or_else(|| NarrowConvertSnafu { requested }.build()))
        .collect()
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl From<&str> for PrimitiveValue {
    fn from(s: &str) -> Self {
        PrimitiveValue::Str(s.to_owned())
    }
}

impl From<String> for PrimitiveValue {
    fn from(s: String) -> Self {
        PrimitiveValue::Str(s)
    }
}

impl From<Vec<String>> for PrimitiveValue {
    fn from(v: Vec<String>) -> Self {
        PrimitiveValue::Strs(v.into_iter().collect())
    }
}

macro_rules! impl_from_numeric {
    ($t:ty, $variant:ident) => {
        impl From<$t> for PrimitiveValue {
            fn from(v: $t) -> Self {
                PrimitiveValue::$variant(smallvec::smallvec![v])
            }
        }

        impl From<Vec<$t>> for PrimitiveValue {
            fn from(v: Vec<$t>) -> Self {
                PrimitiveValue::$variant(v.into_iter().collect())
            }
        }
    };
}

impl_from_numeric!(u8, U8);
impl_from_numeric!(i16, I16);
impl_from_numeric!(u16, U16);
impl_from_numeric!(i32, I32);
impl_from_numeric!(u32, U32);
impl_from_numeric!(i64, I64);
impl_from_numeric!(u64, U64);
impl_from_numeric!(f32, F32);
impl_from_numeric!(f64, F64);

#[cfg(test)]
mod tests {
    use super::PrimitiveValue;

    #[test]
    fn string_joining() {
        let v = PrimitiveValue::from(vec!["1.2.3".to_owned(), "1.2.9".to_owned()]);
        assert_eq!(v.to_str(), "1.2.3\\1.2.9");
        assert_eq!(v.multiplicity(), 2);
        assert_eq!(v.byte_len(), 11);
    }

    #[test]
    fn numeric_conversions() {
        let v = PrimitiveValue::from(3_u16);
        assert_eq!(v.to_int::<i32>().ok(), Some(3));
        assert_eq!(v.to_f64().ok(), Some(3.0));

        let text = PrimitiveValue::from("42");
        assert_eq!(text.to_int::<u16>().ok(), Some(42));
        assert!(PrimitiveValue::from("4x").to_int::<u16>().is_err());
    }

    #[test]
    fn multi_value_byte_lengths() {
        assert_eq!(PrimitiveValue::from(vec![1_u16, 2, 3]).byte_len(), 6);
        assert_eq!(PrimitiveValue::from(vec![1.5_f64]).byte_len(), 8);
        assert_eq!(PrimitiveValue::Empty.byte_len(), 0);
    }

    #[test]
    fn empty_value_errors() {
        assert!(PrimitiveValue::Empty.to_int::<u16>().is_err());
        assert_eq!(PrimitiveValue::Empty.to_multi_str().len(), 0);
    }
}
