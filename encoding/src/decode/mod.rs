//! Element-level decoding: headers under the three base encoding rules
//! and primitive value interpretation.

pub mod basic;
pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;
pub mod value;

pub use self::basic::Endianness;
pub use self::value::decode_primitive_value;

use pacs_core::header::{DataElementHeader, SequenceItemHeader};
use pacs_core::Tag;
use snafu::{Backtrace, Snafu};
use std::io::Read;

/// The possible failures when decoding element headers and values.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not read element tag"))]
    ReadTag {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not read value representation"))]
    ReadVr {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not read value length"))]
    ReadLength {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not read item header"))]
    ReadItemHeader {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("invalid VR code [{:#04X}, {:#04X}] in element {}", bytes[0], bytes[1], tag))]
    BadVrCode {
        tag: Tag,
        bytes: [u8; 2],
        backtrace: Backtrace,
    },
    #[snafu(display("invalid sequence item header"))]
    BadSequenceHeader {
        #[snafu(backtrace)]
        source: pacs_core::header::HeaderError,
    },
    #[snafu(display("could not decode text value"))]
    DecodeText {
        #[snafu(backtrace)]
        source: crate::text::DecodeTextError,
    },
    #[snafu(display("value of length {} under VR {} is not slot-aligned", len, vr))]
    UnalignedValue {
        vr: pacs_core::VR,
        len: u32,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A decoder of data element headers under one encoding rule.
///
/// Value bytes are read separately by the caller,
/// which knows the declared length,
/// and interpreted through [`decode_primitive_value`].
pub trait Decode {
    /// Decode one data element header from the source.
    /// Returns the header and the number of bytes consumed.
    fn decode_header(&self, source: &mut dyn Read) -> Result<(DataElementHeader, usize)>;

    /// Decode a sequence item header (item, item delimiter
    /// or sequence delimiter) from the source.
    /// Always consumes 8 bytes.
    fn decode_item_header(&self, source: &mut dyn Read) -> Result<SequenceItemHeader>;

    /// The byte order of this encoding rule.
    fn endianness(&self) -> Endianness;
}

pub(crate) fn read_tag(source: &mut dyn Read, endianness: Endianness) -> Result<Tag> {
    use snafu::ResultExt;
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf).context(ReadTagSnafu)?;
    Ok(Tag(
        endianness.read_u16(&buf[0..2]),
        endianness.read_u16(&buf[2..4]),
    ))
}
