//! High-level DICOM object handling:
//! the in-memory dataset type,
//! dataset encoding and decoding under any registered transfer syntax,
//! and PS3.10 file reading and writing.
//!
//! The main types are:
//!
//! - [`InMemObject`]: a dataset held fully in memory,
//!   mapping tags to owned data elements in ascending tag order;
//! - [`FileMetaTable`]: the group 0002 file meta information;
//! - [`FileObject`]: a dataset together with its meta table,
//!   as stored in a `.dcm` file.

pub mod file;
pub mod mem;
pub mod meta;
pub mod read;
pub mod write;

pub use crate::file::{sanitized_filename, FileObject, ReadOptions};
pub use crate::mem::{DataElement, InMemObject, InMemValue};
pub use crate::meta::{FileMetaTable, FileMetaTableBuilder};
pub use crate::read::read_dataset;
pub use crate::write::write_dataset;
