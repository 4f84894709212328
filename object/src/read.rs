//! Dataset decoding under a chosen transfer syntax.
//!
//! The decoder works over a fully buffered dataset slice.
//! Every error carries the byte offset and the tag in progress,
//! and no partially built element is ever handed to the caller.

use crate::mem::{DataElement, InMemObject, InMemValue};
use pacs_core::header::{DataElementHeader, SequenceItemHeader};
use pacs_core::value::{Value, C};
use pacs_core::{Tag, VR};
use pacs_encoding::decode::explicit_be::ExplicitVrBeDecoder;
use pacs_encoding::decode::explicit_le::ExplicitVrLeDecoder;
use pacs_encoding::decode::implicit_le::ImplicitVrLeDecoder;
use pacs_encoding::decode::{self, decode_primitive_value, Decode, Endianness};
use pacs_encoding::text::SpecificCharacterSet;
use pacs_dictionary_std::{tags, StandardDataDictionary};
use pacs_transfer_syntax_registry::TransferSyntax;
use snafu::{Backtrace, ResultExt, Snafu};

/// A dataset parsing failure, with the offset at which it occurred
/// and the tag that was being decoded.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not decode element header at offset {}", offset))]
    DecodeHeader {
        offset: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("could not decode item header at offset {}", offset))]
    DecodeItemHeader {
        offset: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("could not decode value of {} at offset {}", tag, offset))]
    DecodeValue {
        offset: u64,
        tag: Tag,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display(
        "element {} at offset {} declares {} bytes, {} available",
        tag,
        offset,
        declared,
        available
    ))]
    TruncatedDataset {
        offset: u64,
        tag: Tag,
        declared: u64,
        available: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("element {} at offset {} has odd length {}", tag, offset, len))]
    OddValueLength {
        offset: u64,
        tag: Tag,
        len: u32,
        backtrace: Backtrace,
    },
    #[snafu(display("unexpected delimiter {} at offset {}", tag, offset))]
    UnexpectedDelimiter {
        offset: u64,
        tag: Tag,
        backtrace: Backtrace,
    },
    #[snafu(display("item delimitation missing for item started near offset {}", offset))]
    MissingItemDelimiter { offset: u64, backtrace: Backtrace },
    #[snafu(display("pixel data item at offset {} has undefined length", offset))]
    UndefinedItemLength { offset: u64, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Build the element decoder for the given transfer syntax.
pub(crate) fn decoder_for(ts: &TransferSyntax) -> Box<dyn Decode> {
    if ts.explicit_vr() {
        match ts.endianness() {
            Endianness::Little => Box::new(ExplicitVrLeDecoder),
            Endianness::Big => Box::new(ExplicitVrBeDecoder),
        }
    } else {
        Box::new(ImplicitVrLeDecoder::new(StandardDataDictionary))
    }
}

/// Decode a full dataset from the given bytes
/// under the given transfer syntax.
pub fn read_dataset(data: &[u8], ts: &TransferSyntax) -> Result<InMemObject> {
    let mut reader = DatasetReader {
        data,
        pos: 0,
        endianness: ts.endianness(),
        charset: SpecificCharacterSet::default(),
        decoder: decoder_for(ts),
    };
    reader.read_elements(Stop::EndOfData)
}

enum Stop {
    /// read until the input is exhausted
    EndOfData,
    /// read until the absolute byte position is reached
    Position(usize),
    /// read until an item delimitation element
    ItemDelimiter,
}

struct DatasetReader<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
    charset: SpecificCharacterSet,
    decoder: Box<dyn Decode>,
}

impl<'a> DatasetReader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_header(&mut self) -> Result<DataElementHeader> {
        let offset = self.pos as u64;
        let (header, bytes_read) = {
            let mut rest = &self.data[self.pos..];
            self.decoder
                .decode_header(&mut rest)
                .context(DecodeHeaderSnafu { offset })?
        };
        self.pos += bytes_read;
        Ok(header)
    }

    fn read_item_header(&mut self) -> Result<SequenceItemHeader> {
        let offset = self.pos as u64;
        let header = {
            let mut rest = &self.data[self.pos..];
            self.decoder
                .decode_item_header(&mut rest)
                .context(DecodeItemHeaderSnafu { offset })?
        };
        self.pos += 8;
        Ok(header)
    }

    fn take(&mut self, len: usize, tag: Tag) -> Result<&'a [u8]> {
        snafu::ensure!(
            len <= self.remaining(),
            TruncatedDatasetSnafu {
                offset: self.pos as u64,
                tag,
                declared: len as u64,
                available: self.remaining() as u64,
            }
        );
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_elements(&mut self, stop: Stop) -> Result<InMemObject> {
        let mut obj = InMemObject::new_empty();
        let start = self.pos as u64;
        loop {
            match stop {
                Stop::Position(end) => {
                    if self.pos >= end {
                        break;
                    }
                }
                Stop::EndOfData => {
                    if self.remaining() == 0 {
                        break;
                    }
                }
                Stop::ItemDelimiter => {
                    snafu::ensure!(
                        self.remaining() > 0,
                        MissingItemDelimiterSnafu { offset: start }
                    );
                }
            }

            let offset = self.pos as u64;
            let header = self.read_header()?;

            if header.tag == Tag(0xFFFE, 0xE00D) {
                match stop {
                    Stop::ItemDelimiter => break,
                    _ => {
                        return UnexpectedDelimiterSnafu {
                            offset,
                            tag: header.tag,
                        }
                        .fail()
                    }
                }
            }
            if header.tag.group() == 0xFFFE {
                return UnexpectedDelimiterSnafu {
                    offset,
                    tag: header.tag,
                }
                .fail();
            }

            let value = self.read_value(offset, header)?;

            if header.tag == tags::SPECIFIC_CHARACTER_SET {
                if let Value::Primitive(v) = &value {
                    if let Some(cs) = SpecificCharacterSet::from_code(&v.to_str()) {
                        self.charset = cs;
                    }
                }
            }

            obj.put(DataElement::from_parts(header, value));
        }
        Ok(obj)
    }

    fn read_value(&mut self, offset: u64, header: DataElementHeader) -> Result<InMemValue> {
        if header.vr == VR::SQ {
            return self.read_sequence(header);
        }
        if header.len.is_undefined() {
            if header.tag == tags::PIXEL_DATA {
                return self.read_pixel_sequence();
            }
            // an undefined-length UN element is a sequence in disguise
            return self.read_sequence(header);
        }

        let len = header.len.0 as usize;
        snafu::ensure!(
            len % 2 == 0,
            OddValueLengthSnafu {
                offset,
                tag: header.tag,
                len: header.len.0,
            }
        );
        let bytes = self.take(len, header.tag)?;
        let value = decode_primitive_value(bytes, header.vr, self.endianness, self.charset)
            .context(DecodeValueSnafu {
                offset,
                tag: header.tag,
            })?;
        Ok(Value::Primitive(value))
    }

    fn read_sequence(&mut self, header: DataElementHeader) -> Result<InMemValue> {
        let mut items = Vec::new();

        if header.len.is_undefined() {
            loop {
                let offset = self.pos as u64;
                match self.read_item_header()? {
                    SequenceItemHeader::Item { len } => {
                        items.push(self.read_item(len)?);
                    }
                    SequenceItemHeader::SequenceDelimiter => break,
                    SequenceItemHeader::ItemDelimiter => {
                        return UnexpectedDelimiterSnafu {
                            offset,
                            tag: Tag(0xFFFE, 0xE00D),
                        }
                        .fail()
                    }
                }
            }
        } else {
            let end = self.pos + header.len.0 as usize;
            snafu::ensure!(
                end <= self.data.len(),
                TruncatedDatasetSnafu {
                    offset: self.pos as u64,
                    tag: header.tag,
                    declared: u64::from(header.len.0),
                    available: self.remaining() as u64,
                }
            );
            while self.pos < end {
                let offset = self.pos as u64;
                match self.read_item_header()? {
                    SequenceItemHeader::Item { len } => {
                        items.push(self.read_item(len)?);
                    }
                    other => {
                        return UnexpectedDelimiterSnafu {
                            offset,
                            tag: pacs_core::Header::tag(&other),
                        }
                        .fail()
                    }
                }
            }
        }

        Ok(Value::Sequence {
            items,
            length: header.len,
        })
    }

    fn read_item(&mut self, len: pacs_core::Length) -> Result<InMemObject> {
        if len.is_undefined() {
            self.read_elements(Stop::ItemDelimiter)
        } else {
            let end = self.pos + len.0 as usize;
            self.read_elements(Stop::Position(end))
        }
    }

    fn read_pixel_sequence(&mut self) -> Result<InMemValue> {
        let mut offset_table: C<u32> = C::new();
        let mut fragments = Vec::new();
        let mut first = true;

        loop {
            let offset = self.pos as u64;
            match self.read_item_header()? {
                SequenceItemHeader::Item { len } => {
                    let len = match len.get() {
                        Some(len) => len as usize,
                        None => return UndefinedItemLengthSnafu { offset }.fail(),
                    };
                    let bytes = self.take(len, tags::PIXEL_DATA)?;
                    if first {
                        offset_table = bytes
                            .chunks_exact(4)
                            .map(|b| self.endianness.read_u32(b))
                            .collect();
                        first = false;
                    } else {
                        fragments.push(bytes.to_vec());
                    }
                }
                SequenceItemHeader::SequenceDelimiter => break,
                SequenceItemHeader::ItemDelimiter => {
                    return UnexpectedDelimiterSnafu {
                        offset,
                        tag: Tag(0xFFFE, 0xE00D),
                    }
                    .fail()
                }
            }
        }

        Ok(Value::PixelSequence {
            offset_table,
            fragments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::read_dataset;
    use pacs_core::{PrimitiveValue, Tag, Value};
    use pacs_dictionary_std::tags;
    use pacs_transfer_syntax_registry::entries;

    #[test]
    fn simple_explicit_le_dataset() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            // (0008,0060) CS "CT"
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'C', b'T',
            // (0010,0010) PN "DOE^JOHN"
            0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x08, 0x00,
            b'D', b'O', b'E', b'^', b'J', b'O', b'H', b'N',
        ];
        let obj = read_dataset(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.string(tags::MODALITY).unwrap(), "CT");
        assert_eq!(obj.string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
    }

    #[test]
    fn undefined_length_sequence_with_empty_item() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            // (0040,0100) SQ, undefined length
            0x40, 0x00, 0x00, 0x01, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            // item, length 0
            0xFE, 0xFF, 0x00, 0xE0, 0x00, 0x00, 0x00, 0x00,
            // sequence delimiter
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let obj = read_dataset(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let seq = obj.element(Tag(0x0040, 0x0100)).unwrap();
        assert_eq!(seq.items().unwrap().len(), 1);
        assert!(seq.items().unwrap()[0].is_empty());
    }

    #[test]
    fn known_length_empty_sequence() {
        let raw: &[u8] = &[
            0x40, 0x00, 0x00, 0x01, b'S', b'Q', 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let obj = read_dataset(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let seq = obj.element(Tag(0x0040, 0x0100)).unwrap();
        assert_eq!(seq.items().unwrap().len(), 0);
    }

    #[test]
    fn truncated_value_is_an_error() {
        let raw: &[u8] = &[
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x08, 0x00, b'C', b'T',
        ];
        let err = read_dataset(raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap_err();
        assert!(err.to_string().contains("(0008,0060)"));
    }

    #[test]
    fn encapsulated_pixel_data_fragments() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            // (7FE0,0010) OB, undefined length
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            // basic offset table, one entry
            0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // one fragment of 4 bytes
            0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0xAB, 0xCD, 0xEF, 0x01,
            // sequence delimiter
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let obj = read_dataset(raw, &entries::JPEG_BASELINE).unwrap();
        match obj.element(tags::PIXEL_DATA).unwrap().value() {
            Value::PixelSequence {
                offset_table,
                fragments,
            } => {
                assert_eq!(offset_table.as_slice(), &[0]);
                assert_eq!(fragments.len(), 1);
                assert_eq!(fragments[0], vec![0xAB, 0xCD, 0xEF, 0x01]);
            }
            other => panic!("expected pixel sequence, got {:?}", other),
        }
    }

    #[test]
    fn implicit_vr_dataset() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            // (0028,0010) Rows = 2 (implicit VR resolves to US)
            0x28, 0x00, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00,
        ];
        let obj = read_dataset(raw, &entries::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let rows: u16 = obj.element(tags::ROWS).unwrap().to_int().unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            obj.element(tags::ROWS).unwrap().value(),
            &Value::Primitive(PrimitiveValue::from(2_u16))
        );
    }
}
