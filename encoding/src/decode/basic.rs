//! Endianness-aware primitive conversions over byte slices.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};

/// The byte order of a transfer syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first (retired syntaxes only).
    Big,
}

macro_rules! dispatch_read {
    ($name:ident, $t:ty) => {
        /// Read one value from the start of the slice.
        #[inline]
        pub fn $name(self, buf: &[u8]) -> $t {
            match self {
                Endianness::Little => LittleEndian::$name(buf),
                Endianness::Big => BigEndian::$name(buf),
            }
        }
    };
}

macro_rules! dispatch_write {
    ($name:ident, $t:ty) => {
        /// Write one value at the start of the slice.
        #[inline]
        pub fn $name(self, buf: &mut [u8], n: $t) {
            match self {
                Endianness::Little => LittleEndian::$name(buf, n),
                Endianness::Big => BigEndian::$name(buf, n),
            }
        }
    };
}

impl Endianness {
    dispatch_read!(read_u16, u16);
    dispatch_read!(read_i16, i16);
    dispatch_read!(read_u32, u32);
    dispatch_read!(read_i32, i32);
    dispatch_read!(read_u64, u64);
    dispatch_read!(read_i64, i64);
    dispatch_read!(read_f32, f32);
    dispatch_read!(read_f64, f64);

    dispatch_write!(write_u16, u16);
    dispatch_write!(write_i16, i16);
    dispatch_write!(write_u32, u32);
    dispatch_write!(write_i32, i32);
    dispatch_write!(write_u64, u64);
    dispatch_write!(write_i64, i64);
    dispatch_write!(write_f32, f32);
    dispatch_write!(write_f64, f64);
}

#[cfg(test)]
mod tests {
    use super::Endianness;

    #[test]
    fn both_orders() {
        let bytes = [0x01, 0x02];
        assert_eq!(Endianness::Little.read_u16(&bytes), 0x0201);
        assert_eq!(Endianness::Big.read_u16(&bytes), 0x0102);

        let mut out = [0u8; 4];
        Endianness::Big.write_u32(&mut out, 0x0A0B0C0D);
        assert_eq!(out, [0x0A, 0x0B, 0x0C, 0x0D]);
    }
}
