//! Explicit VR Big Endian decoder (retired transfer syntax, read-only).

use crate::decode::basic::Endianness;
use crate::decode::explicit_le::{decode_explicit_header, decode_item_header};
use crate::decode::{Decode, Result};
use pacs_core::header::{DataElementHeader, SequenceItemHeader};
use std::io::Read;

/// A data element decoder for the retired Explicit VR Big Endian
/// transfer syntax.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrBeDecoder;

impl Decode for ExplicitVrBeDecoder {
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        decode_explicit_header(source, Endianness::Big)
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        decode_item_header(source, Endianness::Big)
    }

    fn endianness(&self) -> Endianness {
        Endianness::Big
    }
}

#[cfg(test)]
mod tests {
    use super::ExplicitVrBeDecoder;
    use crate::decode::Decode;
    use pacs_core::header::{Header, Length};
    use pacs_core::{Tag, VR};
    use std::io::Cursor;

    //  Tag: (0028,0010) Rows, VR US, length 2 (big-endian numbers)
    const RAW: &[u8] = &[0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02, 0x00, 0x40];

    #[test]
    fn decode_big_endian_header() {
        let dec = ExplicitVrBeDecoder;
        let mut cursor = Cursor::new(RAW);
        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0028, 0x0010));
        assert_eq!(elem.vr(), VR::US);
        assert_eq!(elem.len, Length(2));
        assert_eq!(bytes_read, 8);
    }
}
