//! Interpretation of raw value bytes as primitive values.

use crate::decode::basic::Endianness;
use crate::decode::{DecodeTextSnafu, Result, UnalignedValueSnafu};
use crate::text::SpecificCharacterSet;
use pacs_core::value::C;
use pacs_core::{PrimitiveValue, Tag, VR};
use snafu::ResultExt;

/// Whether values of this VR are separated by backslash on the wire.
fn is_backslash_multivalued(vr: VR) -> bool {
    use VR::*;
    matches!(
        vr,
        AE | AS | CS | DA | DS | DT | IS | LO | PN | SH | TM | UC | UI
    )
}

fn slots<T, F>(data: &[u8], vr: VR, width: usize, mut read: F) -> Result<C<T>>
where
    F: FnMut(&[u8]) -> T,
{
    snafu::ensure!(
        data.len() % width == 0,
        UnalignedValueSnafu {
            vr,
            len: data.len() as u32
        }
    );
    Ok(data.chunks_exact(width).map(|chunk| read(chunk)).collect())
}

/// Interpret the value bytes of one element as a primitive value.
///
/// `data` must be exactly the declared value field;
/// trailing padding of string values is stripped here,
/// so the in-memory value holds logical content only.
pub fn decode_primitive_value(
    data: &[u8],
    vr: VR,
    endianness: Endianness,
    charset: SpecificCharacterSet,
) -> Result<PrimitiveValue> {
    use pacs_core::vr::VrKind;

    if data.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }

    match vr.kind() {
        VrKind::String => {
            let text = charset.codec().decode(data).context(DecodeTextSnafu)?;
            let text = text.trim_end_matches(|c| c == ' ' || c == '\0');
            if text.is_empty() {
                return Ok(PrimitiveValue::Empty);
            }
            if is_backslash_multivalued(vr) && text.contains('\\') {
                Ok(PrimitiveValue::Strs(
                    text.split('\\').map(str::to_owned).collect(),
                ))
            } else {
                Ok(PrimitiveValue::Str(text.to_owned()))
            }
        }
        VrKind::TagList => {
            let tags = slots(data, vr, 4, |b| {
                Tag(endianness.read_u16(&b[0..2]), endianness.read_u16(&b[2..4]))
            })?;
            Ok(PrimitiveValue::Tags(tags))
        }
        VrKind::Numeric => match vr {
            VR::US => Ok(PrimitiveValue::U16(slots(data, vr, 2, |b| {
                endianness.read_u16(b)
            })?)),
            VR::SS => Ok(PrimitiveValue::I16(slots(data, vr, 2, |b| {
                endianness.read_i16(b)
            })?)),
            VR::UL => Ok(PrimitiveValue::U32(slots(data, vr, 4, |b| {
                endianness.read_u32(b)
            })?)),
            VR::SL => Ok(PrimitiveValue::I32(slots(data, vr, 4, |b| {
                endianness.read_i32(b)
            })?)),
            VR::UV => Ok(PrimitiveValue::U64(slots(data, vr, 8, |b| {
                endianness.read_u64(b)
            })?)),
            VR::SV => Ok(PrimitiveValue::I64(slots(data, vr, 8, |b| {
                endianness.read_i64(b)
            })?)),
            VR::FL => Ok(PrimitiveValue::F32(slots(data, vr, 4, |b| {
                endianness.read_f32(b)
            })?)),
            // FD
            _ => Ok(PrimitiveValue::F64(slots(data, vr, 8, |b| {
                endianness.read_f64(b)
            })?)),
        },
        VrKind::Binary => match vr {
            VR::OW => Ok(PrimitiveValue::U16(slots(data, vr, 2, |b| {
                endianness.read_u16(b)
            })?)),
            VR::OL => Ok(PrimitiveValue::U32(slots(data, vr, 4, |b| {
                endianness.read_u32(b)
            })?)),
            VR::OV => Ok(PrimitiveValue::U64(slots(data, vr, 8, |b| {
                endianness.read_u64(b)
            })?)),
            VR::OF => Ok(PrimitiveValue::F32(slots(data, vr, 4, |b| {
                endianness.read_f32(b)
            })?)),
            VR::OD => Ok(PrimitiveValue::F64(slots(data, vr, 8, |b| {
                endianness.read_f64(b)
            })?)),
            // OB, UN
            _ => Ok(PrimitiveValue::U8(data.iter().copied().collect())),
        },
        // sequences are not value-decoded here
        VrKind::Sequence => Ok(PrimitiveValue::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::decode_primitive_value;
    use crate::decode::basic::Endianness;
    use crate::text::SpecificCharacterSet;
    use pacs_core::{PrimitiveValue, Tag, VR};

    fn decode(data: &[u8], vr: VR) -> PrimitiveValue {
        decode_primitive_value(data, vr, Endianness::Little, SpecificCharacterSet::Default)
            .unwrap()
    }

    #[test]
    fn padded_strings_are_stripped() {
        assert_eq!(decode(b"CT ", VR::CS), PrimitiveValue::Str("CT".into()));
        assert_eq!(decode(b"1.2.3\0", VR::UI), PrimitiveValue::Str("1.2.3".into()));
    }

    #[test]
    fn multi_valued_strings_split() {
        let v = decode(b"1.2.3\\1.2.9", VR::UI);
        assert_eq!(v.to_multi_str(), vec!["1.2.3".to_owned(), "1.2.9".to_owned()]);
    }

    #[test]
    fn text_vrs_keep_backslashes() {
        let v = decode(b"line\\one", VR::LT);
        assert_eq!(v, PrimitiveValue::Str("line\\one".into()));
    }

    #[test]
    fn numeric_slots() {
        let v = decode(&[0x40, 0x00, 0x80, 0x00], VR::US);
        assert_eq!(v, PrimitiveValue::U16(smallvec::smallvec![0x40, 0x80]));
        assert!(decode_primitive_value(
            &[0x40, 0x00, 0x80],
            VR::US,
            Endianness::Little,
            SpecificCharacterSet::Default
        )
        .is_err());
    }

    #[test]
    fn attribute_tags() {
        let v = decode(&[0x10, 0x00, 0x20, 0x00], VR::AT);
        assert_eq!(v, PrimitiveValue::Tags(smallvec::smallvec![Tag(0x0010, 0x0020)]));
    }
}
