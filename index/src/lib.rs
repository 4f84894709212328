//! The storage index and selective-metadata services of the PACS:
//!
//! - [`record`]: the projected attributes of one stored SOP instance;
//! - [`catalog`]: the persisted instance catalog with secondary
//!   indexes, journaled to disk and rebuildable from the storage root;
//! - [`query`]: translation of C-FIND identifiers into catalog
//!   queries with the standard matching rules;
//! - [`worklist`]: the modality worklist store and its matching;
//! - [`metadata`]: selective-tag retrieval with preset tag bundles;
//! - [`navigation`]: ordered series traversal;
//! - [`windowing`]: window/level presets and VOI LUT extraction.

pub mod catalog;
pub mod metadata;
pub mod navigation;
pub mod query;
pub mod record;
pub mod windowing;
pub mod worklist;

pub use catalog::InstanceIndex;
pub use query::QueryLevel;
pub use record::IndexRecord;
