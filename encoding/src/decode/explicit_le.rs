//! Explicit VR Little Endian decoder.

use crate::decode::basic::Endianness;
use crate::decode::{read_tag, Decode, ReadItemHeaderSnafu, ReadLengthSnafu, ReadVrSnafu, Result};
use pacs_core::header::{DataElementHeader, Length, SequenceItemHeader};
use pacs_core::{Tag, VR};
use snafu::ResultExt;
use std::io::Read;

/// A data element decoder for the Explicit VR Little Endian transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrLeDecoder;

impl Decode for ExplicitVrLeDecoder {
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        decode_explicit_header(source, Endianness::Little)
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        decode_item_header(source, Endianness::Little)
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }
}

pub(crate) fn decode_explicit_header(
    source: &mut dyn Read,
    endianness: Endianness,
) -> Result<(DataElementHeader, usize)> {
    let tag = read_tag(source, endianness)?;

    let mut buf = [0u8; 4];
    if tag.group() == 0xFFFE {
        // item markers carry no VR, just a 4-byte length
        source.read_exact(&mut buf).context(ReadLengthSnafu)?;
        let len = endianness.read_u32(&buf);
        return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
    }

    source.read_exact(&mut buf[0..2]).context(ReadVrSnafu)?;
    // unrecognized VR codes are kept as UN so that the value
    // can still be skipped over through its length
    let vr = VR::from_binary([buf[0], buf[1]]).unwrap_or(VR::UN);

    let (len, bytes_read) = if vr.uses_long_length() {
        source.read_exact(&mut buf[0..2]).context(ReadLengthSnafu)?;
        source.read_exact(&mut buf).context(ReadLengthSnafu)?;
        (endianness.read_u32(&buf), 12)
    } else {
        source.read_exact(&mut buf[0..2]).context(ReadLengthSnafu)?;
        (u32::from(endianness.read_u16(&buf[0..2])), 8)
    };

    Ok((DataElementHeader::new(tag, vr, Length(len)), bytes_read))
}

pub(crate) fn decode_item_header(
    source: &mut dyn Read,
    endianness: Endianness,
) -> Result<SequenceItemHeader> {
    let mut buf = [0u8; 8];
    source.read_exact(&mut buf).context(ReadItemHeaderSnafu)?;
    let group = endianness.read_u16(&buf[0..2]);
    let element = endianness.read_u16(&buf[2..4]);
    let len = endianness.read_u32(&buf[4..8]);
    SequenceItemHeader::new(Tag(group, element), Length(len))
        .context(crate::decode::BadSequenceHeaderSnafu)
}

#[cfg(test)]
mod tests {
    use super::ExplicitVrLeDecoder;
    use crate::decode::Decode;
    use pacs_core::header::{Header, Length};
    use pacs_core::{Tag, VR};
    use std::io::{Cursor, Read};

    // manually crafted data elements
    //  Tag: (0002,0002) Media Storage SOP Class UID
    //  VR: UI; Length: 26; Value: "1.2.840.10008.5.1.4.1.1.1\0"
    // --
    //  Tag: (0002,0010) Transfer Syntax UID
    //  VR: UI; Length: 20; Value: "1.2.840.10008.1.2.1\0"
    const RAW: &[u8; 62] = &[
        0x02, 0x00, 0x02, 0x00, 0x55, 0x49, 0x1a, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30,
        0x2e, 0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x35, 0x2e, 0x31, 0x2e, 0x34, 0x2e, 0x31, 0x2e,
        0x31, 0x2e, 0x31, 0x00, 0x02, 0x00, 0x10, 0x00, 0x55, 0x49, 0x14, 0x00, 0x31, 0x2e, 0x32,
        0x2e, 0x38, 0x34, 0x30, 0x2e, 0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x31, 0x2e, 0x32, 0x2e,
        0x31, 0x00,
    ];

    #[test]
    fn decode_headers_and_values() {
        let dec = ExplicitVrLeDecoder;
        let mut cursor = Cursor::new(RAW.as_ref());

        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0002, 0x0002));
        assert_eq!(elem.vr(), VR::UI);
        assert_eq!(elem.len, Length(26));
        assert_eq!(bytes_read, 8);

        let mut value = vec![0; 26];
        cursor.read_exact(&mut value).unwrap();
        assert_eq!(&value[0..13], b"1.2.840.10008");

        let (elem, _) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0002, 0x0010));
        assert_eq!(elem.len, Length(20));
    }

    // sequence markers
    //  (0008,103F) SQ, reserved, undefined length
    //  (FFFE,E000) item, undefined length
    //  (FFFE,E00D) item delimiter
    //  (FFFE,E0DD) sequence delimiter
    const RAW_SEQUENCE: &[u8] = &[
        0x08, 0x00, 0x3F, 0x10, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0x00,
        0xE0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, 0xFE, 0xFF,
        0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn decode_sequence_markers() {
        let dec = ExplicitVrLeDecoder;
        let mut cursor = Cursor::new(RAW_SEQUENCE);

        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0008, 0x103F));
        assert_eq!(elem.vr(), VR::SQ);
        assert!(elem.len.is_undefined());
        assert_eq!(bytes_read, 12);

        let item = dec.decode_item_header(&mut cursor).unwrap();
        assert!(item.is_item());
        assert!(item.length().is_undefined());

        let delim = dec.decode_item_header(&mut cursor).unwrap();
        assert!(delim.is_item_delimiter());

        let end = dec.decode_item_header(&mut cursor).unwrap();
        assert!(end.is_sequence_delimiter());
    }
}
