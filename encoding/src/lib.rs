//! This crate contains the encoding and decoding primitives
//! of the PACS suite:
//! reading and writing data element headers and primitive values
//! under the Explicit VR Little Endian, Explicit VR Big Endian
//! and Implicit VR Little Endian encoding rules,
//! plus the character-set handling of string values.
//!
//! Full dataset traversal (sequences, pixel data, files)
//! is built on top of these primitives in `pacs-object`.

pub mod decode;
pub mod encode;
pub mod text;

pub use crate::decode::Decode;
pub use crate::encode::Encode;
pub use crate::text::{SpecificCharacterSet, TextCodec};
