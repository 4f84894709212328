//! De-identification reports.

use crate::profile::AnonymizationProfile;
use chrono::{DateTime, Utc};
use pacs_core::Tag;

/// What was done to one tag (detailed reporting only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagActionRecord {
    pub tag: Tag,
    /// a short action name, e.g. `remove` or `replace_uid`
    pub action: &'static str,
}

/// The outcome of one anonymize call.
#[derive(Debug, Clone)]
pub struct AnonymizationReport {
    pub profile: AnonymizationProfile,
    pub date_offset_days: Option<i64>,
    pub timestamp: DateTime<Utc>,

    pub tags_removed: usize,
    pub tags_emptied: usize,
    pub tags_kept: usize,
    pub tags_replaced: usize,
    pub uids_remapped: usize,
    pub tags_hashed: usize,
    pub tags_encrypted: usize,
    pub dates_shifted: usize,

    /// per-tag records, populated when detailed reporting is on
    pub details: Vec<TagActionRecord>,
    /// non-fatal observations (e.g. pixel data left untouched)
    pub warnings: Vec<String>,
    /// per-tag failures; processing continues past them
    pub errors: Vec<String>,
}

impl AnonymizationReport {
    pub(crate) fn new(profile: AnonymizationProfile, date_offset_days: Option<i64>) -> Self {
        AnonymizationReport {
            profile,
            date_offset_days,
            timestamp: Utc::now(),
            tags_removed: 0,
            tags_emptied: 0,
            tags_kept: 0,
            tags_replaced: 0,
            uids_remapped: 0,
            tags_hashed: 0,
            tags_encrypted: 0,
            dates_shifted: 0,
            details: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The total number of tags acted upon.
    pub fn tags_touched(&self) -> usize {
        self.tags_removed
            + self.tags_emptied
            + self.tags_kept
            + self.tags_replaced
            + self.uids_remapped
            + self.tags_hashed
            + self.tags_encrypted
            + self.dates_shifted
    }
}
