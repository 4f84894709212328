//! Implicit VR Little Endian encoder.

use crate::decode::basic::Endianness;
use crate::encode::{write_tag_and_u32, Encode, Result};
use pacs_core::header::{DataElementHeader, UNDEFINED_LENGTH};
use std::io::Write;

/// A data element encoder for the Implicit VR Little Endian
/// transfer syntax. The VR is not written to the stream.
#[derive(Debug, Default, Clone)]
pub struct ImplicitVrLeEncoder;

impl Encode for ImplicitVrLeEncoder {
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize> {
        let len = header.len.get().unwrap_or(UNDEFINED_LENGTH);
        write_tag_and_u32(
            to,
            Endianness::Little,
            header.tag.group(),
            header.tag.element(),
            len,
        )?;
        Ok(8)
    }

    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()> {
        write_tag_and_u32(to, Endianness::Little, 0xFFFE, 0xE000, len)
    }

    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        write_tag_and_u32(to, Endianness::Little, 0xFFFE, 0xE00D, 0)
    }

    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()> {
        write_tag_and_u32(to, Endianness::Little, 0xFFFE, 0xE0DD, 0)
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }
}

#[cfg(test)]
mod tests {
    use super::ImplicitVrLeEncoder;
    use crate::encode::Encode;
    use pacs_core::header::{DataElementHeader, Length};
    use pacs_core::{Tag, VR};

    #[test]
    fn header_without_vr() {
        let enc = ImplicitVrLeEncoder;
        let mut out = Vec::new();
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag(0x0008, 0x0018), VR::UI, Length(6)),
            )
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(out, vec![0x08, 0x00, 0x18, 0x00, 0x06, 0x00, 0x00, 0x00]);
    }
}
