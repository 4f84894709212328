//! De-identification of DICOM datasets per PS3.15 Annex E.
//!
//! A profile expands to a table of per-tag actions;
//! custom actions override profile entries.
//! UID replacement goes through a bidirectional [`UidMapping`]
//! so that related objects keep consistent identifiers
//! and anonymized identifiers remain traceable back
//! for authorized re-identification.
//!
//! An [`Anonymizer`] instance is owned by one worker;
//! it is not meant to be shared across threads.

pub mod actions;
pub mod profile;
pub mod report;
pub mod uid_mapping;

mod engine;

pub use crate::actions::TagAction;
pub use crate::engine::Anonymizer;
pub use crate::profile::AnonymizationProfile;
pub use crate::report::AnonymizationReport;
pub use crate::uid_mapping::UidMapping;
