//! Standard dictionaries and constants for the PACS suite.
//!
//! This crate provides:
//!
//! - [`StandardDataDictionary`], a queryable attribute dictionary
//!   covering every attribute the suite touches,
//!   used for implicit VR decoding and query-key resolution;
//! - [`tags`], compile-time tag constants named by attribute keyword;
//! - [`uids`], unique identifier constants for transfer syntaxes
//!   and SOP classes, with the SOP-class groupings used during
//!   association negotiation.

mod entries;
pub mod uids;

pub use entries::{tags, ENTRIES};

use once_cell::sync::Lazy;
use pacs_core::dictionary::{DataDictionary, DictionaryEntry};
use pacs_core::Tag;
use std::collections::HashMap;

static BY_TAG: Lazy<HashMap<Tag, &'static DictionaryEntry>> =
    Lazy::new(|| ENTRIES.iter().map(|e| (e.tag, e)).collect());

static BY_NAME: Lazy<HashMap<&'static str, &'static DictionaryEntry>> =
    Lazy::new(|| ENTRIES.iter().map(|e| (e.alias, e)).collect());

/// The standard attribute dictionary, curated from PS3.6.
///
/// A unit type: the backing tables are built once per process.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDataDictionary;

impl DataDictionary for StandardDataDictionary {
    fn by_tag(&self, tag: Tag) -> Option<&DictionaryEntry> {
        BY_TAG.get(&tag).copied()
    }

    fn by_name(&self, name: &str) -> Option<&DictionaryEntry> {
        BY_NAME.get(name).copied()
    }
}
