//! PS3.10 file reading and writing.

use crate::mem::InMemObject;
use crate::meta::FileMetaTable;
use crate::read::read_dataset;
use crate::write::write_dataset;
use pacs_transfer_syntax_registry::{trim_uid, TransferSyntaxRegistry};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The magic code after the 128-byte preamble.
const DICM: &[u8; 4] = b"DICM";

/// A failure while reading or writing a DICOM file.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not read `{}`", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The stream does not carry the `DICM` magic code.
    #[snafu(display("not a DICOM file"))]
    NotDicomFile { backtrace: Backtrace },
    #[snafu(display("invalid file meta information"))]
    Meta {
        #[snafu(backtrace)]
        source: crate::meta::Error,
    },
    /// The declared transfer syntax is not in the registry.
    #[snafu(display("unsupported transfer syntax {}", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display("could not parse main dataset"))]
    ParseDataset {
        #[snafu(backtrace)]
        source: crate::read::Error,
    },
    #[snafu(display("could not encode main dataset"))]
    EncodeDataset {
        #[snafu(backtrace)]
        source: crate::write::Error,
    },
    #[snafu(display("could not write `{}`", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not write file stream"))]
    WriteStream {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Options for reading DICOM files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOptions {
    /// Accept streams without a preamble that start directly
    /// with a recognizable file meta or dataset group.
    pub allow_missing_preamble: bool,
}

/// A main dataset together with its file meta information,
/// as stored in a `.dcm` file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileObject {
    meta: FileMetaTable,
    dataset: InMemObject,
}

impl FileObject {
    /// Assemble a file object from its parts.
    pub fn new(meta: FileMetaTable, dataset: InMemObject) -> Self {
        FileObject { meta, dataset }
    }

    /// The file meta information.
    pub fn meta(&self) -> &FileMetaTable {
        &self.meta
    }

    /// The main dataset.
    pub fn dataset(&self) -> &InMemObject {
        &self.dataset
    }

    /// The main dataset, mutably.
    pub fn dataset_mut(&mut self) -> &mut InMemObject {
        &mut self.dataset
    }

    /// Discard the meta table and keep the dataset.
    pub fn into_dataset(self) -> InMemObject {
        self.dataset
    }

    /// Read a DICOM file from the filesystem with default options.
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_file_with(path, ReadOptions::default())
    }

    /// Read a DICOM file from the filesystem.
    pub fn open_file_with(path: impl AsRef<Path>, options: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).context(ReadFileSnafu { path })?;
        Self::from_bytes(&data, options)
    }

    /// Decode a DICOM file from a fully buffered byte stream.
    pub fn from_bytes(data: &[u8], options: ReadOptions) -> Result<Self> {
        let body = if data.len() >= 132 && &data[128..132] == DICM {
            &data[132..]
        } else if options.allow_missing_preamble && looks_like_dataset_start(data) {
            tracing::debug!("accepting stream without DICM preamble");
            data
        } else {
            return NotDicomFileSnafu.fail();
        };

        let (meta, consumed) = FileMetaTable::from_bytes(body).context(MetaSnafu)?;

        let ts = TransferSyntaxRegistry
            .get(&meta.transfer_syntax)
            .context(UnsupportedTransferSyntaxSnafu {
                uid: trim_uid(&meta.transfer_syntax),
            })?;

        let dataset = read_dataset(&body[consumed..], ts).context(ParseDatasetSnafu)?;
        Ok(FileObject { meta, dataset })
    }

    /// Write the file (preamble, magic code, meta group, dataset)
    /// to the given writer.
    pub fn write_all(&self, to: &mut dyn Write) -> Result<()> {
        let ts = TransferSyntaxRegistry
            .get(&self.meta.transfer_syntax)
            .context(UnsupportedTransferSyntaxSnafu {
                uid: trim_uid(&self.meta.transfer_syntax),
            })?;

        let preamble = [0u8; 128];
        to.write_all(&preamble).context(WriteStreamSnafu)?;
        to.write_all(DICM).context(WriteStreamSnafu)?;
        self.meta.write_to(to).context(MetaSnafu)?;
        write_dataset(&self.dataset, to, ts).context(EncodeDatasetSnafu)?;
        Ok(())
    }

    /// Write the file to the filesystem.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut buffer = Vec::new();
        self.write_all(&mut buffer)?;
        std::fs::write(path, buffer).context(WriteFileSnafu { path })
    }
}

/// Whether the first bytes plausibly start a file meta group
/// or a bare dataset in a little-endian syntax.
fn looks_like_dataset_start(data: &[u8]) -> bool {
    if data.len() < 8 {
        return false;
    }
    let group = u16::from_le_bytes([data[0], data[1]]);
    group == 0x0002 || group == 0x0008
}

/// Build the storage file name for a SOP instance:
/// dots become underscores and the `.dcm` suffix is appended.
pub fn sanitized_filename(sop_instance_uid: &str) -> String {
    let mut name: String = sop_instance_uid
        .trim()
        .trim_end_matches('\0')
        .chars()
        .map(|c| match c {
            '.' => '_',
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => c,
            _ => '_',
        })
        .collect();
    name.push_str(".dcm");
    name
}

#[cfg(test)]
mod tests {
    use super::{sanitized_filename, FileObject, ReadOptions};
    use crate::mem::InMemObject;
    use crate::meta::FileMetaTableBuilder;
    use pacs_core::VR;
    use pacs_dictionary_std::tags;

    fn sample() -> FileObject {
        let mut dataset = InMemObject::new_empty();
        dataset.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
        dataset.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
        dataset.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .build()
            .unwrap();
        FileObject::new(meta, dataset)
    }

    #[test]
    fn file_round_trip() {
        let obj = sample();
        let mut bytes = Vec::new();
        obj.write_all(&mut bytes).unwrap();

        assert_eq!(&bytes[128..132], b"DICM");
        let back = FileObject::from_bytes(&bytes, ReadOptions::default()).unwrap();
        assert_eq!(back.dataset().string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
        assert_eq!(back.meta().transfer_syntax, "1.2.840.10008.1.2.1");
    }

    #[test]
    fn file_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1_2_3_4_5.dcm");
        sample().write_to_file(&path).unwrap();
        let back = FileObject::open_file(&path).unwrap();
        assert_eq!(back.dataset().string(tags::SOP_INSTANCE_UID).unwrap(), "1.2.3.4.5");
    }

    #[test]
    fn garbage_is_not_a_dicom_file() {
        let err = FileObject::from_bytes(&[0u8; 200], ReadOptions::default()).unwrap_err();
        assert!(matches!(err, super::Error::NotDicomFile { .. }));
    }

    #[test]
    fn missing_preamble_accepted_in_legacy_mode() {
        let obj = sample();
        let mut bytes = Vec::new();
        obj.write_all(&mut bytes).unwrap();
        let stripped = &bytes[132..];

        assert!(FileObject::from_bytes(stripped, ReadOptions::default()).is_err());
        let back = FileObject::from_bytes(
            stripped,
            ReadOptions {
                allow_missing_preamble: true,
            },
        )
        .unwrap();
        assert_eq!(back.dataset().string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
    }

    #[test]
    fn filenames_from_sop_instance_uid() {
        assert_eq!(sanitized_filename("1.2.3.4.5"), "1_2_3_4_5.dcm");
        assert_eq!(sanitized_filename("1.2.3\0"), "1_2_3.dcm");
        assert_eq!(sanitized_filename("../evil"), "___evil.dcm");
    }
}
