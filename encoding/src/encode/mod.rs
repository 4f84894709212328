//! Element-level encoding: headers under the three base encoding rules
//! and primitive value serialization with even-length padding.

pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;
pub mod value;

pub use self::value::encode_primitive_value;

use crate::decode::basic::Endianness;
use pacs_core::header::DataElementHeader;
use snafu::{Backtrace, Snafu};
use std::io::Write;

/// The possible failures when encoding element headers and values.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not write element header"))]
    WriteHeader {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not write element value"))]
    WriteValue {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not encode text value"))]
    EncodeText {
        #[snafu(backtrace)]
        source: crate::text::EncodeTextError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// An encoder of data element headers under one encoding rule.
///
/// Value bytes are produced separately through
/// [`encode_primitive_value`] and written by the caller,
/// which also owns the length bookkeeping.
pub trait Encode {
    /// Write one data element header.
    /// Returns the number of bytes written.
    fn encode_element_header(
        &self,
        to: &mut dyn Write,
        header: DataElementHeader,
    ) -> Result<usize>;

    /// Write a sequence item header with the given length
    /// (possibly undefined).
    fn encode_item_header(&self, to: &mut dyn Write, len: u32) -> Result<()>;

    /// Write an item delimitation element.
    fn encode_item_delimiter(&self, to: &mut dyn Write) -> Result<()>;

    /// Write a sequence delimitation element.
    fn encode_sequence_delimiter(&self, to: &mut dyn Write) -> Result<()>;

    /// The byte order of this encoding rule.
    fn endianness(&self) -> Endianness;
}

pub(crate) fn write_tag_and_u32(
    to: &mut dyn Write,
    endianness: Endianness,
    group: u16,
    element: u16,
    value: u32,
) -> Result<()> {
    use snafu::ResultExt;
    let mut buf = [0u8; 8];
    endianness.write_u16(&mut buf[0..2], group);
    endianness.write_u16(&mut buf[2..4], element);
    endianness.write_u32(&mut buf[4..8], value);
    to.write_all(&buf).context(WriteHeaderSnafu)
}
