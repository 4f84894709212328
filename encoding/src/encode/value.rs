//! Serialization of primitive values, with even-length padding.

use crate::decode::basic::Endianness;
use crate::encode::{EncodeTextSnafu, Result};
use crate::text::SpecificCharacterSet;
use pacs_core::{PrimitiveValue, VR};
use snafu::ResultExt;

fn write_slots<T, F>(values: &[T], width: usize, mut write: F) -> Vec<u8>
where
    T: Copy,
    F: FnMut(&mut [u8], T),
{
    let mut out = vec![0u8; values.len() * width];
    for (chunk, &v) in out.chunks_exact_mut(width).zip(values.iter()) {
        write(chunk, v);
    }
    out
}

/// Serialize a primitive value under the given byte order and
/// character set, padding the result to even length with the
/// padding byte of the value representation.
pub fn encode_primitive_value(
    value: &PrimitiveValue,
    vr: VR,
    endianness: Endianness,
    charset: SpecificCharacterSet,
) -> Result<Vec<u8>> {
    use PrimitiveValue::*;
    let mut out = match value {
        Empty => Vec::new(),
        Str(_) | Strs(_) => {
            let text = value.to_str();
            charset.codec().encode(&text).context(EncodeTextSnafu)?
        }
        Tags(tags) => {
            let mut out = vec![0u8; tags.len() * 4];
            for (chunk, tag) in out.chunks_exact_mut(4).zip(tags.iter()) {
                endianness.write_u16(&mut chunk[0..2], tag.group());
                endianness.write_u16(&mut chunk[2..4], tag.element());
            }
            out
        }
        U8(v) => v.to_vec(),
        I16(v) => write_slots(v, 2, |b, x| endianness.write_i16(b, x)),
        U16(v) => write_slots(v, 2, |b, x| endianness.write_u16(b, x)),
        I32(v) => write_slots(v, 4, |b, x| endianness.write_i32(b, x)),
        U32(v) => write_slots(v, 4, |b, x| endianness.write_u32(b, x)),
        I64(v) => write_slots(v, 8, |b, x| endianness.write_i64(b, x)),
        U64(v) => write_slots(v, 8, |b, x| endianness.write_u64(b, x)),
        F32(v) => write_slots(v, 4, |b, x| endianness.write_f32(b, x)),
        F64(v) => write_slots(v, 8, |b, x| endianness.write_f64(b, x)),
    };

    if out.len() % 2 != 0 {
        out.push(vr.padding());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::encode_primitive_value;
    use crate::decode::basic::Endianness;
    use crate::decode::decode_primitive_value;
    use crate::text::SpecificCharacterSet;
    use pacs_core::{PrimitiveValue, VR};

    fn encode(value: &PrimitiveValue, vr: VR) -> Vec<u8> {
        encode_primitive_value(value, vr, Endianness::Little, SpecificCharacterSet::Default)
            .unwrap()
    }

    #[test]
    fn odd_strings_get_padded() {
        assert_eq!(encode(&PrimitiveValue::from("1.2.3"), VR::UI), b"1.2.3\0");
        assert_eq!(encode(&PrimitiveValue::from("DOE"), VR::PN), b"DOE ");
        // a one-character value needs exactly one pad byte
        assert_eq!(encode(&PrimitiveValue::from("M"), VR::CS), b"M ");
    }

    #[test]
    fn even_strings_left_alone() {
        assert_eq!(encode(&PrimitiveValue::from("CT"), VR::CS), b"CT");
    }

    #[test]
    fn numeric_encoding_round_trip() {
        let value = PrimitiveValue::from(vec![0x0040_u16, 0x0080]);
        let bytes = encode(&value, VR::US);
        assert_eq!(bytes, vec![0x40, 0x00, 0x80, 0x00]);
        let back = decode_primitive_value(
            &bytes,
            VR::US,
            Endianness::Little,
            SpecificCharacterSet::Default,
        )
        .unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn big_endian_numeric() {
        let bytes = encode_primitive_value(
            &PrimitiveValue::from(0x1234_u16),
            VR::US,
            Endianness::Big,
            SpecificCharacterSet::Default,
        )
        .unwrap();
        assert_eq!(bytes, vec![0x12, 0x34]);
    }
}
