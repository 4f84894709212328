//! Transfer syntax catalog for the PACS suite.
//!
//! Each [`TransferSyntax`] entry carries the four decisions
//! a transfer syntax makes:
//! byte order, VR explicitness, pixel-data encapsulation,
//! and which external codec handles encapsulated frames.
//!
//! The [`TransferSyntaxRegistry`] is process-global and immutable;
//! a UID that is not in the registry is not negotiable.
//! Pixel-data codec *providers* are registered separately
//! in a [`CodecRegistry`](adapters::CodecRegistry),
//! which is an explicit object owned by the embedding application,
//! so that pixel support can vary per deployment
//! without touching the syntax catalog.

pub mod adapters;
pub mod entries;

use once_cell::sync::Lazy;
use pacs_encoding::decode::Endianness;
use std::collections::HashMap;

/// Classification of a transfer syntax's pixel data handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Pixel data is native (uncompressed slots in the pixel data element).
    None,
    /// Pixel data is encapsulated in fragments,
    /// to be handled by a registered codec provider.
    Encapsulated,
}

/// The description of a single transfer syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    uid: &'static str,
    name: &'static str,
    endianness: Endianness,
    explicit_vr: bool,
    codec: Codec,
    retired: bool,
}

impl TransferSyntax {
    /// Create a new transfer syntax descriptor.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        endianness: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            endianness,
            explicit_vr,
            codec,
            retired: false,
        }
    }

    /// Create a descriptor for a retired transfer syntax,
    /// which is decoded but never written.
    pub const fn new_retired(
        uid: &'static str,
        name: &'static str,
        endianness: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            endianness,
            explicit_vr,
            codec,
            retired: true,
        }
    }

    /// The unique identifier of this transfer syntax.
    pub fn uid(&self) -> &'static str {
        self.uid
    }

    /// The descriptive name of this transfer syntax.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The byte order of encoded datasets.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Whether value representations are on the wire.
    pub fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Whether pixel data is encapsulated in fragments.
    pub fn is_encapsulated(&self) -> bool {
        self.codec == Codec::Encapsulated
    }

    /// Whether the syntax is retired in the standard.
    /// Retired syntaxes are read-only: decoding is supported,
    /// dataset writers refuse them.
    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

/// Strip the trailing null padding a UID may carry on the wire.
pub fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches('\0').trim()
}

static REGISTRY: Lazy<HashMap<&'static str, &'static TransferSyntax>> =
    Lazy::new(|| entries::ALL.iter().map(|ts| (ts.uid, ts)).collect());

/// The process-global transfer syntax registry.
///
/// A unit type; the backing table is built once and never mutated.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Look up a transfer syntax by UID.
    /// Trailing padding in the UID is ignored.
    pub fn get(&self, uid: &str) -> Option<&'static TransferSyntax> {
        REGISTRY.get(trim_uid(uid)).copied()
    }

    /// Whether the UID names a known transfer syntax.
    pub fn contains(&self, uid: &str) -> bool {
        self.get(uid).is_some()
    }

    /// Iterate over all registered transfer syntaxes.
    pub fn iter(&self) -> impl Iterator<Item = &'static TransferSyntax> {
        entries::ALL.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{entries, TransferSyntaxRegistry};
    use pacs_encoding::decode::Endianness;

    #[test]
    fn base_syntaxes_present() {
        let reg = TransferSyntaxRegistry;
        let ivrle = reg.get("1.2.840.10008.1.2").unwrap();
        assert!(!ivrle.explicit_vr());
        assert_eq!(ivrle.endianness(), Endianness::Little);
        assert!(!ivrle.is_encapsulated());

        let evrbe = reg.get("1.2.840.10008.1.2.2").unwrap();
        assert!(evrbe.is_retired());
        assert_eq!(evrbe.endianness(), Endianness::Big);
    }

    #[test]
    fn padded_uid_resolves() {
        let reg = TransferSyntaxRegistry;
        assert!(reg.get("1.2.840.10008.1.2.1\0").is_some());
    }

    #[test]
    fn unknown_uid_is_absent() {
        let reg = TransferSyntaxRegistry;
        assert!(reg.get("1.2.840.10008.1.2.4.999").is_none());
    }

    #[test]
    fn encapsulated_flags() {
        assert!(entries::JPEG_BASELINE.is_encapsulated());
        assert!(entries::RLE_LOSSLESS.is_encapsulated());
        assert!(!entries::EXPLICIT_VR_LITTLE_ENDIAN.is_encapsulated());
    }
}
