//! In-memory dataset representation.

use pacs_core::header::{DataElementHeader, Header, Length};
use pacs_core::value::{ConvertValueError, PrimitiveValue, Value};
use pacs_core::{Tag, VR};
use pacs_encoding::text::SpecificCharacterSet;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::borrow::Cow;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// The value type of in-memory data elements,
/// with sequence items being in-memory datasets.
pub type InMemValue = Value<InMemObject>;

/// An error raised when accessing an element of a dataset.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum AccessError {
    /// The requested element is not in the dataset.
    #[snafu(display("no such element {}", tag))]
    MissingElement { tag: Tag, backtrace: Backtrace },
    /// The element exists but its value does not convert
    /// to the requested form.
    #[snafu(display("could not convert value of {}", tag))]
    ConvertValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: ConvertValueError,
    },
    /// A primitive value was requested from a sequence
    /// or pixel sequence element.
    #[snafu(display("element {} is not a primitive value", tag))]
    NotPrimitive { tag: Tag, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, AccessError>;

/// An owned DICOM data element: a header plus a value tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    header: DataElementHeader,
    value: InMemValue,
}

impl DataElement {
    /// Create a data element from the given parts.
    ///
    /// The header length is derived from the value:
    /// the even-padded byte length for primitives,
    /// undefined for sequences and pixel sequences
    /// (which are written in delimited form).
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, value: impl Into<InMemValue>) -> Self {
        let value = value.into();
        let len = match &value {
            Value::Primitive(v) => {
                let len = v.byte_len();
                Length((len + len % 2) as u32)
            }
            Value::Sequence { .. } | Value::PixelSequence { .. } => Length::UNDEFINED,
        };
        DataElement {
            header: DataElementHeader::new(tag, vr, len),
            value,
        }
    }

    /// Create an empty (zero-length) data element.
    pub fn empty<T: Into<Tag>>(tag: T, vr: VR) -> Self {
        DataElement {
            header: DataElementHeader::new(tag, vr, Length(0)),
            value: Value::Primitive(PrimitiveValue::Empty),
        }
    }

    /// Create a sequence data element from its items.
    pub fn new_sequence<T: Into<Tag>>(tag: T, items: Vec<InMemObject>) -> Self {
        DataElement {
            header: DataElementHeader::new(tag, VR::SQ, Length::UNDEFINED),
            value: Value::Sequence {
                items,
                length: Length::UNDEFINED,
            },
        }
    }

    pub(crate) fn from_parts(header: DataElementHeader, value: InMemValue) -> Self {
        DataElement { header, value }
    }

    /// Retrieve the element header.
    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    /// Retrieve the value representation.
    pub fn vr(&self) -> VR {
        self.header.vr()
    }

    /// Retrieve the value.
    pub fn value(&self) -> &InMemValue {
        &self.value
    }

    /// Take the value out of the element.
    pub fn into_value(self) -> InMemValue {
        self.value
    }

    /// Render the element's value as a single string.
    pub fn to_str(&self) -> Result<Cow<str>> {
        Ok(self.require_primitive()?.to_str())
    }

    /// Read the element's first value as an integer.
    pub fn to_int<T>(&self) -> Result<T>
    where
        T: num_traits::NumCast + std::str::FromStr,
    {
        self.require_primitive()?
            .to_int()
            .context(ConvertValueSnafu {
                tag: self.header.tag,
            })
    }

    /// Read the element's first value as a float.
    pub fn to_f64(&self) -> Result<f64> {
        self.require_primitive()?
            .to_f64()
            .context(ConvertValueSnafu {
                tag: self.header.tag,
            })
    }

    /// Read all of the element's values as floats.
    pub fn to_multi_f64(&self) -> Result<Vec<f64>> {
        self.require_primitive()?
            .to_multi_f64()
            .context(ConvertValueSnafu {
                tag: self.header.tag,
            })
    }

    /// The sequence items, if this element is a sequence.
    pub fn items(&self) -> Option<&[InMemObject]> {
        self.value.items()
    }

    fn require_primitive(&self) -> Result<&PrimitiveValue> {
        self.value.primitive().context(NotPrimitiveSnafu {
            tag: self.header.tag,
        })
    }
}

impl Header for DataElement {
    fn tag(&self) -> Tag {
        self.header.tag
    }

    fn length(&self) -> Length {
        self.header.len
    }
}

/// A DICOM dataset held fully in memory.
///
/// Elements are kept in ascending tag order,
/// which is also the mandated encoding order.
/// A dataset is a value: cloning clones the whole tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemObject {
    entries: BTreeMap<Tag, DataElement>,
}

impl InMemObject {
    /// Create an empty dataset.
    pub fn new_empty() -> Self {
        InMemObject::default()
    }

    /// The number of top-level elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dataset has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an element, replacing and returning
    /// any element previously at the same tag.
    pub fn put(&mut self, element: DataElement) -> Option<DataElement> {
        self.entries.insert(element.header.tag, element)
    }

    /// Insert a primitive element built from the given parts.
    pub fn put_str<T: Into<Tag>>(&mut self, tag: T, vr: VR, value: impl Into<String>) {
        let tag = tag.into();
        self.put(DataElement::new(
            tag,
            vr,
            PrimitiveValue::from(value.into()),
        ));
    }

    /// Obtain an element by tag, if present.
    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.entries.get(&tag)
    }

    /// Obtain an element by tag, with a missing-element error otherwise.
    pub fn element(&self, tag: Tag) -> Result<&DataElement> {
        self.entries.get(&tag).context(MissingElementSnafu { tag })
    }

    /// Whether an element with this tag exists.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Remove an element by tag, returning it if it was present.
    pub fn remove(&mut self, tag: Tag) -> Option<DataElement> {
        self.entries.remove(&tag)
    }

    /// Iterate over the elements in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = &DataElement> {
        self.entries.values()
    }

    /// Iterate over the tags in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().copied()
    }

    /// Read a string value, trimmed of insignificant trailing space,
    /// or an error if the element is absent.
    pub fn string(&self, tag: Tag) -> Result<Cow<str>> {
        let s = self.element(tag)?.to_str()?;
        match s {
            Cow::Borrowed(b) => Ok(Cow::Borrowed(b.trim_end())),
            Cow::Owned(o) => Ok(Cow::Owned(o.trim_end().to_owned())),
        }
    }

    /// Read a string value, or `None` when the element is absent
    /// or empty.
    pub fn string_opt(&self, tag: Tag) -> Option<String> {
        let s = self.get(tag)?.to_str().ok()?;
        let s = s.trim_end();
        if s.is_empty() {
            None
        } else {
            Some(s.to_owned())
        }
    }

    /// The specific character set of this dataset,
    /// derived from `(0008,0005)`; unsupported or absent codes
    /// fall back to the default repertoire.
    pub fn character_set(&self) -> SpecificCharacterSet {
        self.string_opt(Tag(0x0008, 0x0005))
            .and_then(|code| SpecificCharacterSet::from_code(&code))
            .unwrap_or_default()
    }
}

impl IntoIterator for InMemObject {
    type Item = DataElement;
    type IntoIter = InMemObjectIntoIter;

    fn into_iter(self) -> Self::IntoIter {
        InMemObjectIntoIter {
            inner: self.entries.into_iter(),
        }
    }
}

/// Owning iterator over the elements of a dataset.
pub struct InMemObjectIntoIter {
    inner: btree_map::IntoIter<Tag, DataElement>,
}

impl Iterator for InMemObjectIntoIter {
    type Item = DataElement;

    fn next(&mut self) -> Option<DataElement> {
        self.inner.next().map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::{DataElement, InMemObject};
    use pacs_core::header::{Header, Length};
    use pacs_core::{PrimitiveValue, Tag, VR};

    #[test]
    fn elements_iterate_in_tag_order() {
        let mut obj = InMemObject::new_empty();
        obj.put_str(Tag(0x0010, 0x0010), VR::PN, "DOE^JOHN");
        obj.put_str(Tag(0x0008, 0x0060), VR::CS, "CT");
        obj.put_str(Tag(0x0020, 0x000D), VR::UI, "1.2.3");

        let tags: Vec<Tag> = obj.tags().collect();
        assert_eq!(
            tags,
            vec![Tag(0x0008, 0x0060), Tag(0x0010, 0x0010), Tag(0x0020, 0x000D)]
        );
    }

    #[test]
    fn element_length_is_even() {
        let e = DataElement::new(Tag(0x0008, 0x0060), VR::CS, PrimitiveValue::from("CT"));
        assert_eq!(e.length(), Length(2));
        let odd = DataElement::new(Tag(0x0010, 0x0020), VR::LO, PrimitiveValue::from("123"));
        assert_eq!(odd.length(), Length(4));
    }

    #[test]
    fn put_replaces_by_tag() {
        let mut obj = InMemObject::new_empty();
        obj.put_str(Tag(0x0010, 0x0020), VR::LO, "123");
        let old = obj.put(DataElement::new(
            Tag(0x0010, 0x0020),
            VR::LO,
            PrimitiveValue::from("456"),
        ));
        assert!(old.is_some());
        assert_eq!(obj.string(Tag(0x0010, 0x0020)).unwrap(), "456");
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn missing_element_error_names_tag() {
        let obj = InMemObject::new_empty();
        let err = obj.element(Tag(0x0008, 0x0018)).unwrap_err();
        assert!(err.to_string().contains("(0008,0018)"));
    }

    #[test]
    fn sequences_own_their_items() {
        let mut item = InMemObject::new_empty();
        item.put_str(Tag(0x0040, 0x0002), VR::DA, "20240115");
        let seq = DataElement::new_sequence(Tag(0x0040, 0x0100), vec![item]);
        assert_eq!(seq.items().unwrap().len(), 1);
        let copy = seq.clone();
        assert_eq!(copy, seq);
    }
}
