//! Data dictionary traits.
//!
//! A data dictionary provides the identity and default value
//! representation of DICOM attributes,
//! which the implicit VR transfer syntax relies on.

use crate::tag::Tag;
use crate::vr::VR;

/// One attribute entry in a data dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// the attribute tag
    pub tag: Tag,
    /// the keyword of the attribute, as in PS3.6
    pub alias: &'static str,
    /// the default value representation
    pub vr: VR,
}

/// A type which can be consulted for DICOM attribute information.
pub trait DataDictionary {
    /// Fetch the entry for the given tag, if known.
    fn by_tag(&self, tag: Tag) -> Option<&DictionaryEntry>;

    /// Fetch the entry with the given keyword, if known.
    fn by_name(&self, name: &str) -> Option<&DictionaryEntry>;

    /// The value representation to assume for a tag
    /// decoded under implicit VR.
    ///
    /// Unknown attributes and private tags fall back to UN;
    /// group length elements are always UL.
    fn vr_of(&self, tag: Tag) -> VR {
        if tag.is_group_length() {
            return VR::UL;
        }
        self.by_tag(tag).map(|e| e.vr).unwrap_or(VR::UN)
    }
}

impl<T: DataDictionary + ?Sized> DataDictionary for &T {
    fn by_tag(&self, tag: Tag) -> Option<&DictionaryEntry> {
        (**self).by_tag(tag)
    }

    fn by_name(&self, name: &str) -> Option<&DictionaryEntry> {
        (**self).by_name(name)
    }
}
