//! Dataset encoding under a chosen transfer syntax.
//!
//! Sequences and encapsulated pixel data are written in
//! delimited (undefined length) form; a dataset decoded from
//! known-length sequences will re-encode with delimiters,
//! which is a tolerated reflow under the standard.

use crate::mem::{DataElement, InMemObject};
use pacs_core::header::{DataElementHeader, Length};
use pacs_core::{Tag, Value};
use pacs_encoding::encode::explicit_be::ExplicitVrBeEncoder;
use pacs_encoding::encode::explicit_le::ExplicitVrLeEncoder;
use pacs_encoding::encode::implicit_le::ImplicitVrLeEncoder;
use pacs_encoding::encode::{self, encode_primitive_value, Encode};
use pacs_encoding::decode::Endianness;
use pacs_encoding::text::SpecificCharacterSet;
use pacs_transfer_syntax_registry::TransferSyntax;
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::Write;

/// A dataset encoding failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The transfer syntax is retired and is never written.
    #[snafu(display("refusing to write retired transfer syntax {}", uid))]
    WriteRetiredTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display("could not write header of {}", tag))]
    WriteHeader {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
    #[snafu(display("could not encode value of {}", tag))]
    EncodeValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
    #[snafu(display("could not write value of {}", tag))]
    WriteValue {
        tag: Tag,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Build the element encoder for the given transfer syntax.
/// Retired syntaxes are refused.
pub(crate) fn encoder_for(ts: &TransferSyntax) -> Result<Box<dyn Encode>> {
    snafu::ensure!(
        !ts.is_retired(),
        WriteRetiredTransferSyntaxSnafu { uid: ts.uid() }
    );
    if ts.explicit_vr() {
        match ts.endianness() {
            Endianness::Little => Ok(Box::new(ExplicitVrLeEncoder)),
            Endianness::Big => Ok(Box::new(ExplicitVrBeEncoder)),
        }
    } else {
        Ok(Box::new(ImplicitVrLeEncoder))
    }
}

/// Encode a full dataset to the given writer
/// under the given transfer syntax.
pub fn write_dataset(obj: &InMemObject, to: &mut dyn Write, ts: &TransferSyntax) -> Result<()> {
    let encoder = encoder_for(ts)?;
    let charset = obj.character_set();
    write_elements(obj, to, encoder.as_ref(), ts.endianness(), charset)
}

fn write_elements(
    obj: &InMemObject,
    to: &mut dyn Write,
    encoder: &dyn Encode,
    endianness: Endianness,
    charset: SpecificCharacterSet,
) -> Result<()> {
    for element in obj.iter() {
        write_element(element, to, encoder, endianness, charset)?;
    }
    Ok(())
}

fn write_element(
    element: &DataElement,
    to: &mut dyn Write,
    encoder: &dyn Encode,
    endianness: Endianness,
    charset: SpecificCharacterSet,
) -> Result<()> {
    let tag = element.header().tag;
    match element.value() {
        Value::Primitive(value) => {
            let bytes = encode_primitive_value(value, element.vr(), endianness, charset)
                .context(EncodeValueSnafu { tag })?;
            let header =
                DataElementHeader::new(tag, element.vr(), Length(bytes.len() as u32));
            encoder
                .encode_element_header(to, header)
                .context(WriteHeaderSnafu { tag })?;
            to.write_all(&bytes).context(WriteValueSnafu { tag })?;
        }
        Value::Sequence { items, .. } => {
            let header = DataElementHeader::new(tag, element.vr(), Length::UNDEFINED);
            encoder
                .encode_element_header(to, header)
                .context(WriteHeaderSnafu { tag })?;
            for item in items {
                encoder
                    .encode_item_header(to, pacs_core::header::UNDEFINED_LENGTH)
                    .context(WriteHeaderSnafu { tag })?;
                // an item may override the character set for its subtree
                let item_charset = if item.contains(Tag(0x0008, 0x0005)) {
                    item.character_set()
                } else {
                    charset
                };
                write_elements(item, to, encoder, endianness, item_charset)?;
                encoder
                    .encode_item_delimiter(to)
                    .context(WriteHeaderSnafu { tag })?;
            }
            encoder
                .encode_sequence_delimiter(to)
                .context(WriteHeaderSnafu { tag })?;
        }
        Value::PixelSequence {
            offset_table,
            fragments,
        } => {
            let header = DataElementHeader::new(tag, element.vr(), Length::UNDEFINED);
            encoder
                .encode_element_header(to, header)
                .context(WriteHeaderSnafu { tag })?;

            // basic offset table item, possibly empty
            encoder
                .encode_item_header(to, (offset_table.len() * 4) as u32)
                .context(WriteHeaderSnafu { tag })?;
            let mut buf = [0u8; 4];
            for &entry in offset_table.iter() {
                endianness.write_u32(&mut buf, entry);
                to.write_all(&buf).context(WriteValueSnafu { tag })?;
            }

            for fragment in fragments {
                encoder
                    .encode_item_header(to, fragment.len() as u32)
                    .context(WriteHeaderSnafu { tag })?;
                to.write_all(fragment).context(WriteValueSnafu { tag })?;
            }
            encoder
                .encode_sequence_delimiter(to)
                .context(WriteHeaderSnafu { tag })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_dataset;
    use crate::mem::{DataElement, InMemObject};
    use crate::read::read_dataset;
    use pacs_core::{PrimitiveValue, Tag, VR};
    use pacs_dictionary_std::tags;
    use pacs_transfer_syntax_registry::entries;

    fn sample() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put_str(tags::MODALITY, VR::CS, "CT");
        obj.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        obj.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
        obj.put(DataElement::new(
            tags::ROWS,
            VR::US,
            PrimitiveValue::from(2_u16),
        ));
        let mut item = InMemObject::new_empty();
        item.put_str(tags::SCHEDULED_PROCEDURE_STEP_START_DATE, VR::DA, "20240115");
        obj.put(DataElement::new_sequence(
            tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE,
            vec![item],
        ));
        obj
    }

    #[test]
    fn round_trip_explicit_le() {
        let obj = sample();
        let mut bytes = Vec::new();
        write_dataset(&obj, &mut bytes, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let back = read_dataset(&bytes, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(back.string(tags::MODALITY).unwrap(), "CT");
        assert_eq!(back.string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
        let seq = back
            .element(tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE)
            .unwrap();
        assert_eq!(seq.items().unwrap().len(), 1);
    }

    #[test]
    fn round_trip_implicit_le() {
        let obj = sample();
        let mut bytes = Vec::new();
        write_dataset(&obj, &mut bytes, &entries::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let back = read_dataset(&bytes, &entries::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let rows: u16 = back.element(tags::ROWS).unwrap().to_int().unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn byte_exact_round_trip_from_wire() {
        // decode-encode of a delimited stream reproduces the input
        #[rustfmt::skip]
        let raw: Vec<u8> = vec![
            0x08, 0x00, 0x60, 0x00, b'C', b'S', 0x02, 0x00, b'C', b'T',
            0x40, 0x00, 0x00, 0x01, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            0x40, 0x00, 0x02, 0x00, b'D', b'A', 0x08, 0x00,
            b'2', b'0', b'2', b'4', b'0', b'1', b'1', b'5',
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let obj = read_dataset(&raw, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let mut bytes = Vec::new();
        write_dataset(&obj, &mut bytes, &entries::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(bytes, raw);
    }

    #[test]
    fn retired_syntax_refused_on_write() {
        let obj = sample();
        let mut bytes = Vec::new();
        let err = write_dataset(&obj, &mut bytes, &entries::EXPLICIT_VR_BIG_ENDIAN).unwrap_err();
        assert!(err.to_string().contains("retired"));
    }
}
