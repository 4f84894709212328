//! The pixel data codec provider interface.
//!
//! Actual image codecs (JPEG, JPEG-LS, JPEG 2000, RLE) live outside
//! this suite; they plug in by implementing [`PixelDataCodec`]
//! and registering under the transfer syntax UID they serve.
//! The [`CodecRegistry`] is built by the embedding application at
//! startup and then shared immutably.

use snafu::{Backtrace, Snafu};
use std::collections::HashMap;
use std::sync::Arc;

/// The pixel module attributes a codec needs to interpret frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelParams {
    pub rows: u16,
    pub columns: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub samples_per_pixel: u16,
    pub planar_configuration: u16,
    pub photometric_interpretation: String,
    pub number_of_frames: u32,
    /// lossy quality hint in 1..=100, encode only
    pub quality: Option<u8>,
}

/// An error from a pixel data codec provider.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum CodecError {
    /// No provider is registered for the transfer syntax.
    #[snafu(display("no pixel data codec registered for {}", uid))]
    NoProvider { uid: String, backtrace: Backtrace },
    /// The provider failed to decode the frame data.
    #[snafu(display("pixel data decoding failed: {}", message))]
    DecodeFrames { message: String, backtrace: Backtrace },
    /// The provider failed to encode the frame data.
    #[snafu(display("pixel data encoding failed: {}", message))]
    EncodeFrames { message: String, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// A provider of pixel data encoding and decoding
/// for one encapsulated transfer syntax.
pub trait PixelDataCodec: Send + Sync {
    /// Decode encapsulated fragments into native pixel data.
    fn decode(&self, frames: &[Vec<u8>], params: &PixelParams) -> Result<Vec<u8>>;

    /// Encode native pixel data into encapsulated fragments,
    /// one per frame.
    fn encode(&self, raw: &[u8], params: &PixelParams) -> Result<Vec<Vec<u8>>>;
}

/// A registry of pixel data codec providers, keyed by
/// transfer syntax UID.
///
/// Providers are registered during startup; afterwards the registry
/// is shared behind an `Arc` and never mutated.
#[derive(Default)]
pub struct CodecRegistry {
    providers: HashMap<String, Arc<dyn PixelDataCodec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CodecRegistry::default()
    }

    /// Register a provider for the given transfer syntax UID,
    /// replacing any previous provider for the same UID.
    pub fn register(&mut self, uid: impl Into<String>, provider: Arc<dyn PixelDataCodec>) {
        self.providers.insert(uid.into(), provider);
    }

    /// Look up the provider for a transfer syntax.
    pub fn get(&self, uid: &str) -> Option<&Arc<dyn PixelDataCodec>> {
        self.providers.get(crate::trim_uid(uid))
    }

    /// Retrieve the provider for a transfer syntax,
    /// or a [`CodecError::NoProvider`] error.
    pub fn require(&self, uid: &str) -> Result<&Arc<dyn PixelDataCodec>> {
        self.get(uid).ok_or_else(|| {
            NoProviderSnafu {
                uid: crate::trim_uid(uid).to_owned(),
            }
            .build()
        })
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{CodecError, CodecRegistry, PixelDataCodec, PixelParams};
    use std::sync::Arc;

    struct Passthrough;

    impl PixelDataCodec for Passthrough {
        fn decode(&self, frames: &[Vec<u8>], _params: &PixelParams) -> super::Result<Vec<u8>> {
            Ok(frames.concat())
        }

        fn encode(&self, raw: &[u8], _params: &PixelParams) -> super::Result<Vec<Vec<u8>>> {
            Ok(vec![raw.to_vec()])
        }
    }

    #[test]
    fn register_and_resolve() {
        let mut reg = CodecRegistry::new();
        reg.register("1.2.840.10008.1.2.5", Arc::new(Passthrough));
        assert!(reg.get("1.2.840.10008.1.2.5").is_some());
        assert!(reg.get("1.2.840.10008.1.2.5\0").is_some());
        assert!(matches!(
            reg.require("1.2.840.10008.1.2.4.50"),
            Err(CodecError::NoProvider { .. })
        ));
    }
}
