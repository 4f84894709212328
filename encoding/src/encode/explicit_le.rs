//! Explicit VR Little Endian encoder.

use crate::decode::basic::Endianness;
use crate::encode::{write_tag_and_u32, Encode, Result, WriteHeaderSnafu};
use pacs_core::header::DataElementHeader;
use pacs_core::header::UNDEFINED_LENGTH;
use snafu::ResultExt;
use std::io::Write;

/// A data element encoder for the Explicit VR Little Endian transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrLeEncoder;

impl Encode for ExplicitVrLeEncoder {
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize> {
        encode_explicit_header(to, Endianness::Little, header)
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

pub(crate) fn encode_explicit_header(
    to: &mut dyn Write,
    endianness: Endianness,
    header: DataElementHeader,
) -> Result<usize> {
    let len = header.len.get().unwrap_or(UNDEFINED_LENGTH);
    let vr_bytes = header.vr.to_bytes();

    if header.vr.uses_long_length() {
        let mut buf = [0u8; 12];
        endianness.write_u16(&mut buf[0..2], header.tag.group());
        endianness.write_u16(&mut buf[2..4], header.tag.element());
        buf[4] = vr_bytes[0];
        buf[5] = vr_bytes[1];
        // bytes 6..8 are the reserved field
        endianness.write_u32(&mut buf[8..12], len);
        to.write_all(&buf).context(WriteHeaderSnafu)?;
        Ok(12)
    } else {
        let mut buf = [0u8; 8];
        endianness.write_u16(&mut buf[0..2], header.tag.group());
        endianness.write_u16(&mut buf[2..4], header.tag.element());
        buf[4] = vr_bytes[0];
        buf[5] = vr_bytes[1];
        endianness.write_u16(&mut buf[6..8], len as u16);
        to.write_all(&buf).context(WriteHeaderSnafu)?;
        Ok(8)
    }
}

#[cfg(test)]
mod tests {
    use super::ExplicitVrLeEncoder;
    use crate::encode::Encode;
    use pacs_core::header::{DataElementHeader, Length};
    use pacs_core::{Tag, VR};

    #[test]
    fn short_form_header() {
        let enc = ExplicitVrLeEncoder;
        let mut out = Vec::new();
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(8)),
            )
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(
            out,
            vec![0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x08, 0x00]
        );
    }

    #[test]
    fn long_form_header() {
        let enc = ExplicitVrLeEncoder;
        let mut out = Vec::new();
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new(Tag(0x7FE0, 0x0010), VR::OB, Length(4)),
            )
            .unwrap();
        assert_eq!(n, 12);
        assert_eq!(
            out,
            vec![0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0x04, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn sequence_markers() {
        let enc = ExplicitVrLeEncoder;
        let mut out = Vec::new();
        enc.encode_item_header(&mut out, 0xFFFF_FFFF).unwrap();
        enc.encode_item_delimiter(&mut out).unwrap();
        enc.encode_sequence_delimiter(&mut out).unwrap();
        assert_eq!(
            out,
            vec![
                0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF, //
                0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, //
                0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
            ]
        );
    }
}
