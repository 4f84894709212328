//! Compiled transfer syntax specifiers.

use crate::{Codec, TransferSyntax};
use pacs_encoding::decode::Endianness;

// -- the three base transfer syntaxes, fully supported --

pub static IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2",
    "Implicit VR Little Endian",
    Endianness::Little,
    false,
    Codec::None,
);

pub static EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.1",
    "Explicit VR Little Endian",
    Endianness::Little,
    true,
    Codec::None,
);

pub static EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax::new_retired(
    "1.2.840.10008.1.2.2",
    "Explicit VR Big Endian",
    Endianness::Big,
    true,
    Codec::None,
);

// -- encapsulated transfer syntaxes, pixel data through codec providers --

pub static RLE_LOSSLESS: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.5",
    "RLE Lossless",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_BASELINE: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.50",
    "JPEG Baseline (Process 1)",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_EXTENDED: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.51",
    "JPEG Extended (Process 2 & 4)",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_LOSSLESS: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.57",
    "JPEG Lossless, Non-Hierarchical (Process 14)",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_LOSSLESS_SV1: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.70",
    "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_LS_LOSSLESS: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.80",
    "JPEG-LS Lossless Image Compression",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_LS_LOSSY: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.81",
    "JPEG-LS Lossy (Near-Lossless) Image Compression",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_2000_LOSSLESS: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.90",
    "JPEG 2000 Image Compression (Lossless Only)",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

pub static JPEG_2000: TransferSyntax = TransferSyntax::new(
    "1.2.840.10008.1.2.4.91",
    "JPEG 2000 Image Compression",
    Endianness::Little,
    true,
    Codec::Encapsulated,
);

/// All transfer syntaxes known to this build.
pub static ALL: &[TransferSyntax] = &[
    IMPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_BIG_ENDIAN,
    RLE_LOSSLESS,
    JPEG_BASELINE,
    JPEG_EXTENDED,
    JPEG_LOSSLESS,
    JPEG_LOSSLESS_SV1,
    JPEG_LS_LOSSLESS,
    JPEG_LS_LOSSY,
    JPEG_2000_LOSSLESS,
    JPEG_2000,
];
