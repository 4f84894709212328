//! Value module: primitive values and the full value tree,
//! including sequences and encapsulated pixel data.

pub mod dates;
pub mod primitive;

pub use self::primitive::{ConvertValueError, PrimitiveValue, C};

use crate::header::Length;
use crate::tag::Tag;

/// The value of a data element, generic over the dataset type `D`
/// used for sequence items.
///
/// Sequence items own their child datasets exclusively;
/// cloning a value clones the whole subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<D> {
    /// A primitive (non-nested) value.
    Primitive(PrimitiveValue),
    /// A sequence of nested datasets,
    /// with the length hint recorded at decoding time.
    Sequence {
        /// the ordered items of the sequence
        items: Vec<D>,
        /// the sequence length as declared in the stream
        /// (undefined for delimited sequences)
        length: Length,
    },
    /// Encapsulated pixel data:
    /// a basic offset table item followed by one item per fragment.
    PixelSequence {
        /// the byte offsets in the basic offset table
        offset_table: C<u32>,
        /// the compressed fragments, in item order
        fragments: Vec<Vec<u8>>,
    },
}

impl<D> Value<D> {
    /// Whether the value is a primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Primitive(_))
    }

    /// Obtain the primitive value, if this is one.
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// Obtain the sequence items, if this is a sequence.
    pub fn items(&self) -> Option<&[D]> {
        match self {
            Value::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Obtain the sequence items mutably, if this is a sequence.
    pub fn items_mut(&mut self) -> Option<&mut Vec<D>> {
        match self {
            Value::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// The number of values: the multiplicity of a primitive,
    /// the number of items of a sequence,
    /// or the number of fragments of encapsulated pixel data.
    pub fn multiplicity(&self) -> u32 {
        match self {
            Value::Primitive(v) => v.multiplicity(),
            Value::Sequence { items, .. } => items.len() as u32,
            Value::PixelSequence { fragments, .. } => fragments.len() as u32,
        }
    }
}

impl<D> From<PrimitiveValue> for Value<D> {
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl<D> From<&str> for Value<D> {
    fn from(v: &str) -> Self {
        Value::Primitive(PrimitiveValue::from(v))
    }
}

/// Convenience conversion from a tag list (for VR `AT`).
impl<D> From<Tag> for Value<D> {
    fn from(tag: Tag) -> Self {
        Value::Primitive(PrimitiveValue::Tags(smallvec::smallvec![tag]))
    }
}
