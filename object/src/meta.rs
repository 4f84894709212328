//! File meta information (group 0002) handling.
//!
//! The file meta group is always encoded in Explicit VR Little Endian,
//! regardless of the transfer syntax of the main dataset,
//! and is prefixed by its own group length element `(0002,0000)`.

use crate::mem::{DataElement, InMemObject};
use crate::read::read_dataset;
use crate::write::write_dataset;
use pacs_core::{PrimitiveValue, Tag, VR};
use pacs_dictionary_std::tags;
use pacs_encoding::decode::explicit_le::ExplicitVrLeDecoder;
use pacs_encoding::decode::{Decode, Endianness};
use pacs_transfer_syntax_registry::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;

/// The implementation class UID of this suite,
/// generated under the UUID-derived arc per PS3.5 B.2.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.305828736383184136879919485884343304509";

/// The implementation version name of this suite.
pub const IMPLEMENTATION_VERSION_NAME: &str = "PACS-RS 0.1.0";

/// A failure while reading or building file meta information.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not decode file meta group length"))]
    DecodeGroupLength {
        #[snafu(backtrace)]
        source: pacs_encoding::decode::Error,
    },
    #[snafu(display("unexpected leading element {} in file meta group", tag))]
    UnexpectedTag { tag: Tag, backtrace: Backtrace },
    #[snafu(display("file meta group is truncated"))]
    TruncatedMeta { backtrace: Backtrace },
    #[snafu(display("could not decode file meta group"))]
    DecodeMeta {
        #[snafu(backtrace)]
        source: crate::read::Error,
    },
    #[snafu(display("could not encode file meta group"))]
    EncodeMeta {
        #[snafu(backtrace)]
        source: crate::write::Error,
    },
    #[snafu(display("could not write file meta group"))]
    WriteMeta {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("file meta group has no transfer syntax UID"))]
    MissingTransferSyntax { backtrace: Backtrace },
    #[snafu(display("missing required file meta field `{}`", name))]
    MissingField {
        name: &'static str,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The file meta information of a PS3.10 file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    /// `(0002,0001)` two-byte version marker, `00 01`
    pub information_version: [u8; 2],
    /// `(0002,0002)` the SOP class of the stored object
    pub media_storage_sop_class_uid: String,
    /// `(0002,0003)` the SOP instance of the stored object
    pub media_storage_sop_instance_uid: String,
    /// `(0002,0010)` the transfer syntax of the main dataset
    pub transfer_syntax: String,
    /// `(0002,0012)` the implementation that wrote the file
    pub implementation_class_uid: String,
    /// `(0002,0013)` version name of that implementation
    pub implementation_version_name: Option<String>,
    /// `(0002,0016)` the AE title that sourced the object
    pub source_application_entity_title: Option<String>,
}

impl FileMetaTable {
    /// Start building a file meta table.
    pub fn builder() -> FileMetaTableBuilder {
        FileMetaTableBuilder::new()
    }

    /// Decode a file meta group from the start of `data`.
    ///
    /// Returns the table and the number of bytes consumed
    /// (the group length element plus the declared group size).
    pub fn from_bytes(data: &[u8]) -> Result<(FileMetaTable, usize)> {
        let decoder = ExplicitVrLeDecoder;
        let mut rest = data;
        let (header, header_len) = decoder
            .decode_header(&mut rest)
            .context(DecodeGroupLengthSnafu)?;
        snafu::ensure!(
            header.tag == tags::FILE_META_INFORMATION_GROUP_LENGTH,
            UnexpectedTagSnafu { tag: header.tag }
        );
        snafu::ensure!(data.len() >= header_len + 4, TruncatedMetaSnafu);
        let group_length =
            Endianness::Little.read_u32(&data[header_len..header_len + 4]) as usize;

        let body_start = header_len + 4;
        snafu::ensure!(
            data.len() >= body_start + group_length,
            TruncatedMetaSnafu
        );
        let body = &data[body_start..body_start + group_length];
        let group = read_dataset(body, &EXPLICIT_VR_LITTLE_ENDIAN).context(DecodeMetaSnafu)?;

        let information_version = group
            .get(tags::FILE_META_INFORMATION_VERSION)
            .and_then(|e| e.value().primitive())
            .and_then(|v| v.as_bytes())
            .map(|b| if b.len() >= 2 { [b[0], b[1]] } else { [0, 1] })
            .unwrap_or([0, 1]);

        let table = FileMetaTable {
            information_version,
            media_storage_sop_class_uid: group
                .string_opt(tags::MEDIA_STORAGE_SOP_CLASS_UID)
                .unwrap_or_default(),
            media_storage_sop_instance_uid: group
                .string_opt(tags::MEDIA_STORAGE_SOP_INSTANCE_UID)
                .unwrap_or_default(),
            transfer_syntax: group
                .string_opt(tags::TRANSFER_SYNTAX_UID)
                .context(MissingTransferSyntaxSnafu)?,
            implementation_class_uid: group
                .string_opt(tags::IMPLEMENTATION_CLASS_UID)
                .unwrap_or_default(),
            implementation_version_name: group.string_opt(tags::IMPLEMENTATION_VERSION_NAME),
            source_application_entity_title: group
                .string_opt(tags::SOURCE_APPLICATION_ENTITY_TITLE),
        };

        Ok((table, body_start + group_length))
    }

    /// Serialize the meta group, including the computed
    /// `(0002,0000)` group length, to the given writer.
    pub fn write_to(&self, to: &mut dyn Write) -> Result<()> {
        let mut group = InMemObject::new_empty();
        group.put(DataElement::new(
            tags::FILE_META_INFORMATION_VERSION,
            VR::OB,
            PrimitiveValue::from(self.information_version.to_vec()),
        ));
        group.put_str(
            tags::MEDIA_STORAGE_SOP_CLASS_UID,
            VR::UI,
            self.media_storage_sop_class_uid.clone(),
        );
        group.put_str(
            tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
            VR::UI,
            self.media_storage_sop_instance_uid.clone(),
        );
        group.put_str(tags::TRANSFER_SYNTAX_UID, VR::UI, self.transfer_syntax.clone());
        group.put_str(
            tags::IMPLEMENTATION_CLASS_UID,
            VR::UI,
            self.implementation_class_uid.clone(),
        );
        if let Some(name) = &self.implementation_version_name {
            group.put_str(tags::IMPLEMENTATION_VERSION_NAME, VR::SH, name.clone());
        }
        if let Some(aet) = &self.source_application_entity_title {
            group.put_str(tags::SOURCE_APPLICATION_ENTITY_TITLE, VR::AE, aet.clone());
        }

        let mut body = Vec::new();
        write_dataset(&group, &mut body, &EXPLICIT_VR_LITTLE_ENDIAN).context(EncodeMetaSnafu)?;

        let mut length_element = Vec::with_capacity(12);
        let mut glen = InMemObject::new_empty();
        glen.put(DataElement::new(
            tags::FILE_META_INFORMATION_GROUP_LENGTH,
            VR::UL,
            PrimitiveValue::from(body.len() as u32),
        ));
        write_dataset(&glen, &mut length_element, &EXPLICIT_VR_LITTLE_ENDIAN)
            .context(EncodeMetaSnafu)?;

        to.write_all(&length_element).context(WriteMetaSnafu)?;
        to.write_all(&body).context(WriteMetaSnafu)?;
        Ok(())
    }
}

/// A builder for [`FileMetaTable`] values.
///
/// The SOP class UID, SOP instance UID and transfer syntax
/// are required; the implementation identifiers default to
/// this suite's.
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
    source_application_entity_title: Option<String>,
}

impl FileMetaTableBuilder {
    /// Create a builder with no fields set.
    pub fn new() -> Self {
        FileMetaTableBuilder::default()
    }

    /// Define the media storage SOP class UID.
    pub fn media_storage_sop_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.media_storage_sop_class_uid = Some(uid.into());
        self
    }

    /// Define the media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid(mut self, uid: impl Into<String>) -> Self {
        self.media_storage_sop_instance_uid = Some(uid.into());
        self
    }

    /// Define the transfer syntax of the main dataset.
    pub fn transfer_syntax(mut self, uid: impl Into<String>) -> Self {
        self.transfer_syntax = Some(uid.into());
        self
    }

    /// Define the implementation class UID.
    pub fn implementation_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.implementation_class_uid = Some(uid.into());
        self
    }

    /// Define the implementation version name.
    pub fn implementation_version_name(mut self, name: impl Into<String>) -> Self {
        self.implementation_version_name = Some(name.into());
        self
    }

    /// Define the source application entity title.
    pub fn source_application_entity_title(mut self, aet: impl Into<String>) -> Self {
        self.source_application_entity_title = Some(aet.into());
        self
    }

    /// Build the table, failing if a required field is missing.
    pub fn build(self) -> Result<FileMetaTable> {
        Ok(FileMetaTable {
            information_version: [0, 1],
            media_storage_sop_class_uid: self
                .media_storage_sop_class_uid
                .context(MissingFieldSnafu {
                    name: "MediaStorageSOPClassUID",
                })?,
            media_storage_sop_instance_uid: self.media_storage_sop_instance_uid.context(
                MissingFieldSnafu {
                    name: "MediaStorageSOPInstanceUID",
                },
            )?,
            transfer_syntax: self.transfer_syntax.context(MissingFieldSnafu {
                name: "TransferSyntaxUID",
            })?,
            implementation_class_uid: self
                .implementation_class_uid
                .unwrap_or_else(|| IMPLEMENTATION_CLASS_UID.to_owned()),
            implementation_version_name: Some(
                self.implementation_version_name
                    .unwrap_or_else(|| IMPLEMENTATION_VERSION_NAME.to_owned()),
            ),
            source_application_entity_title: self.source_application_entity_title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FileMetaTable, FileMetaTableBuilder};

    fn sample_meta() -> FileMetaTable {
        FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .build()
            .unwrap()
    }

    #[test]
    fn meta_round_trip() {
        let meta = sample_meta();
        let mut bytes = Vec::new();
        meta.write_to(&mut bytes).unwrap();

        let (back, consumed) = FileMetaTable::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(back.transfer_syntax, "1.2.840.10008.1.2.1");
        assert_eq!(back.media_storage_sop_instance_uid, "1.2.3.4.5");
        assert_eq!(back.information_version, [0, 1]);
    }

    #[test]
    fn group_length_matches_serialized_size() {
        let meta = sample_meta();
        let mut bytes = Vec::new();
        meta.write_to(&mut bytes).unwrap();
        // (0002,0000) UL 4 | length
        let declared = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(declared, bytes.len() - 12);
    }

    #[test]
    fn missing_required_field() {
        let err = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("MediaStorageSOPInstanceUID"));
    }
}
