//! Explicit VR Big Endian encoder.
//!
//! The syntax is retired; this encoder exists so that
//! byte-exact round-trips of archived objects remain testable.
//! New objects are never written under it.

use crate::decode::basic::Endianness;
use crate::encode::explicit_le::encode_explicit_header;
use crate::encode::{write_tag_and_u32, Encode, Result};
use pacs_core::header::DataElementHeader;
use std::io::Write;

/// A data element encoder for the retired Explicit VR Big Endian
/// transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrBeEncoder;

impl Encode for ExplicitVrBeEncoder {
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize> {
        encode_explicit_header(to, Endianness::Big, header)
    }

    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()> {
        write_tag_and_u32(to, Endianness::Big, 0xFFFE, 0xE000, len)
    }

    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        write_tag_and_u32(to, Endianness::Big, 0xFFFE, 0xE00D, 0)
    }

    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        write_tag_and_u32(to, Endianness::Big, 0xFFFE, 0xE0DD, 0)
    }

    fn endianness(&self) -> Endianness {
        Endianness::Big
    }
}
