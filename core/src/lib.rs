//! This crate contains the base data types of the PACS core,
//! upon which every other layer of the suite is built:
//! attribute tags, value representations, element headers,
//! primitive values and the in-memory value tree.
//!
//! The types in this crate make no assumption about
//! how datasets are encoded or transmitted.
//! Encoding rules live in `pacs-encoding`,
//! and full dataset handling lives in `pacs-object`.

pub mod dictionary;
pub mod header;
pub mod tag;
pub mod value;
pub mod vr;

pub use crate::dictionary::{DataDictionary, DictionaryEntry};
pub use crate::header::{DataElementHeader, Header, Length, SequenceItemHeader};
pub use crate::tag::Tag;
pub use crate::value::{PrimitiveValue, Value};
pub use crate::vr::{VrKind, VR};
