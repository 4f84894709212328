//! Text encoding support,
//! covering the character repertoires the suite accepts
//! for string value representations.
//!
//! The default repertoire (ISO-IR 6) applies
//! when `(0008,0005) SpecificCharacterSet` is absent.

use snafu::{Backtrace, Snafu};

/// An error raised when text cannot be decoded under a character set.
#[derive(Debug, Snafu)]
#[snafu(display("invalid {} text at byte {}", charset, position))]
pub struct DecodeTextError {
    charset: &'static str,
    position: usize,
    backtrace: Backtrace,
}

/// An error raised when text cannot be encoded under a character set.
#[derive(Debug, Snafu)]
#[snafu(display("character `{}` not representable in {}", ch, charset))]
pub struct EncodeTextError {
    charset: &'static str,
    ch: char,
    backtrace: Backtrace,
}

/// A text codec for one supported character repertoire.
pub trait TextCodec {
    /// The defined term of this repertoire, as used in
    /// `(0008,0005) SpecificCharacterSet`.
    fn name(&self) -> &'static str;

    /// Decode the given bytes as text.
    fn decode(&self, text: &[u8]) -> Result<String, DecodeTextError>;

    /// Encode the given text to bytes.
    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeTextError>;
}

/// The default character repertoire codec (ISO-IR 6, basic G0 set).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCharacterSetCodec;

impl TextCodec for DefaultCharacterSetCodec {
    fn name(&self) -> &'static str {
        "ISO_IR 6"
    }

    fn decode(&self, text: &[u8]) -> Result<String, DecodeTextError> {
        if let Some(position) = text.iter().position(|&b| b > 0x7F) {
            return DecodeTextSnafu {
                charset: self.name(),
                position,
            }
            .fail();
        }
        // control characters are tolerated; they occur as padding
        Ok(text.iter().map(|&b| b as char).collect())
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeTextError> {
        match text.chars().find(|&c| c as u32 > 0x7F) {
            Some(ch) => EncodeTextSnafu {
                charset: self.name(),
                ch,
            }
            .fail(),
            None => Ok(text.bytes().collect()),
        }
    }
}

/// Codec for ISO-IR 100 (Latin alphabet No. 1).
#[derive(Debug, Default, Clone, Copy)]
pub struct IsoIr100Codec;

impl TextCodec for IsoIr100Codec {
    fn name(&self) -> &'static str {
        "ISO_IR 100"
    }

    fn decode(&self, text: &[u8]) -> Result<String, DecodeTextError> {
        // Latin-1 maps byte-for-byte onto the first Unicode block
        Ok(text.iter().map(|&b| b as char).collect())
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeTextError> {
        text.chars()
            .map(|c| {
                if (c as u32) <= 0xFF {
                    Ok(c as u8)
                } else {
                    EncodeTextSnafu {
                        charset: self.name(),
                        ch: c,
                    }
                    .fail()
                }
            })
            .collect()
    }
}

/// Codec for ISO-IR 192 (Unicode in UTF-8).
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Codec;

impl TextCodec for Utf8Codec {
    fn name(&self) -> &'static str {
        "ISO_IR 192"
    }

    fn decode(&self, text: &[u8]) -> Result<String, DecodeTextError> {
        std::str::from_utf8(text)
            .map(str::to_owned)
            .map_err(|e| {
                DecodeTextSnafu {
                    charset: self.name(),
                    position: e.valid_up_to(),
                }
                .build()
            })
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeTextError> {
        Ok(text.as_bytes().to_vec())
    }
}

/// A supported specific character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecificCharacterSet {
    /// ISO-IR 6, the default repertoire
    Default,
    /// ISO-IR 100, Latin-1
    IsoIr100,
    /// ISO-IR 192, UTF-8
    Utf8,
}

impl Default for SpecificCharacterSet {
    fn default() -> Self {
        SpecificCharacterSet::Default
    }
}

impl SpecificCharacterSet {
    /// Resolve a `(0008,0005)` defined term to a supported character set.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim_end().trim_end_matches('\0') {
            "" | "ISO_IR 6" | "ISO 2022 IR 6" => Some(SpecificCharacterSet::Default),
            "ISO_IR 100" | "ISO 2022 IR 100" => Some(SpecificCharacterSet::IsoIr100),
            "ISO_IR 192" => Some(SpecificCharacterSet::Utf8),
            _ => None,
        }
    }

    /// Retrieve the codec for this character set.
    pub fn codec(self) -> &'static dyn TextCodec {
        match self {
            SpecificCharacterSet::Default => &DefaultCharacterSetCodec,
            SpecificCharacterSet::IsoIr100 => &IsoIr100Codec,
            SpecificCharacterSet::Utf8 => &Utf8Codec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_codec_rejects_non_ascii() {
        let codec = DefaultCharacterSetCodec;
        assert_eq!(codec.decode(b"DOE^JOHN").unwrap(), "DOE^JOHN");
        assert!(codec.decode(&[0x44, 0xC3, 0xA9]).is_err());
    }

    #[test]
    fn latin1_round_trip() {
        let codec = IsoIr100Codec;
        let encoded = codec.encode("Mu\u{00E9}ller").unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), "Mu\u{00E9}ller");
    }

    #[test]
    fn charset_resolution() {
        assert_eq!(
            SpecificCharacterSet::from_code("ISO_IR 100"),
            Some(SpecificCharacterSet::IsoIr100)
        );
        assert_eq!(
            SpecificCharacterSet::from_code(""),
            Some(SpecificCharacterSet::Default)
        );
        assert_eq!(SpecificCharacterSet::from_code("ISO_IR 13"), None);
    }
}
