//! Implicit VR Little Endian decoder.
//!
//! The VR of each element is not on the wire;
//! it is resolved through a data dictionary.

use crate::decode::basic::Endianness;
use crate::decode::explicit_le::decode_item_header;
use crate::decode::{read_tag, Decode, ReadLengthSnafu, Result};
use pacs_core::dictionary::DataDictionary;
use pacs_core::header::{DataElementHeader, Length, SequenceItemHeader};
use pacs_core::VR;
use snafu::ResultExt;
use std::io::Read;

/// A data element decoder for the Implicit VR Little Endian
/// transfer syntax, resolving value representations
/// through the given data dictionary.
#[derive(Debug, Default, Clone)]
pub struct ImplicitVrLeDecoder<D> {
    dict: D,
}

impl<D> ImplicitVrLeDecoder<D>
where
    D: DataDictionary,
{
    /// Create a decoder backed by the given dictionary.
    pub fn new(dict: D) -> Self {
        ImplicitVrLeDecoder { dict }
    }
}

impl<D> Decode for ImplicitVrLeDecoder<D>
where
    D: DataDictionary,
{
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)> {
        let tag = read_tag(source, Endianness::Little)?;
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).context(ReadLengthSnafu)?;
        let len = Length(Endianness::Little.read_u32(&buf));

        let vr = if tag.group() == 0xFFFE {
            VR::UN
        } else if len.is_undefined() {
            // an undefined length under implicit VR can only be
            // a sequence (or UN treated as one)
            VR::SQ
        } else {
            self.dict.vr_of(tag)
        };

        Ok((DataElementHeader::new(tag, vr, len), 8))
    }

    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader> {
        decode_item_header(source, Endianness::Little)
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }
}
