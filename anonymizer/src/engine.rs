//! The de-identification engine.

use crate::actions::{profile_actions, TagAction};
use crate::profile::AnonymizationProfile;
use crate::report::{AnonymizationReport, TagActionRecord};
use crate::uid_mapping::UidMapping;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use chrono::Duration;
use pacs_core::value::dates::{format_date, parse_date};
use pacs_core::Tag;
use pacs_dictionary_std::tags;
use pacs_object::{DataElement, InMemObject};
use rand::Rng;
use sha2::{Digest, Sha256};
use snafu::{Backtrace, Snafu};
use std::collections::BTreeMap;

/// A configuration error of the anonymizer.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// AES-256-GCM needs a 32-byte key.
    #[snafu(display("encryption key must be 32 bytes, got {}", length))]
    BadKeyLength { length: usize, backtrace: Backtrace },
}

/// The profile-driven de-identification engine.
///
/// One instance belongs to one worker; share a [`UidMapping`]
/// across workers instead when consistent UID remapping is needed.
#[derive(Debug)]
pub struct Anonymizer {
    profile: AnonymizationProfile,
    custom_actions: BTreeMap<Tag, TagAction>,
    date_offset_days: Option<i64>,
    hash_salt: Option<String>,
    encryption_key: Option<[u8; 32]>,
    detailed_reporting: bool,
}

impl Anonymizer {
    /// Create an engine for the given profile.
    pub fn new(profile: AnonymizationProfile) -> Self {
        Anonymizer {
            profile,
            custom_actions: BTreeMap::new(),
            date_offset_days: None,
            hash_salt: None,
            encryption_key: None,
            detailed_reporting: false,
        }
    }

    /// Switch to another profile. Custom actions are kept.
    pub fn set_profile(&mut self, profile: AnonymizationProfile) {
        self.profile = profile;
    }

    /// The active profile.
    pub fn profile(&self) -> AnonymizationProfile {
        self.profile
    }

    /// Add or override the action of one tag.
    /// Custom actions take precedence over the profile table.
    pub fn add_tag_action(&mut self, tag: Tag, action: TagAction) {
        self.custom_actions.insert(tag, action);
    }

    /// Drop every custom action.
    pub fn clear_custom_actions(&mut self) {
        self.custom_actions.clear();
    }

    /// Configure the day offset applied by `ShiftDate` actions.
    pub fn set_date_offset(&mut self, days: i64) {
        self.date_offset_days = Some(days);
    }

    /// The configured day offset, if any.
    pub fn date_offset(&self) -> Option<i64> {
        self.date_offset_days
    }

    /// Drop the configured day offset;
    /// `ShiftDate` degrades to `Empty` without one.
    pub fn clear_date_offset(&mut self) {
        self.date_offset_days = None;
    }

    /// Configure a random day offset within the given bounds
    /// and return it.
    pub fn randomize_date_offset(&mut self, min_days: i64, max_days: i64) -> i64 {
        let offset = rand::thread_rng().gen_range(min_days..=max_days);
        self.date_offset_days = Some(offset);
        offset
    }

    /// Configure the salt prepended to hashed values.
    pub fn set_hash_salt(&mut self, salt: impl Into<String>) {
        self.hash_salt = Some(salt.into());
    }

    /// Configure the AES-256-GCM key used by `Encrypt` actions.
    pub fn set_encryption_key(&mut self, key: &[u8]) -> Result<(), Error> {
        snafu::ensure!(key.len() == 32, BadKeyLengthSnafu { length: key.len() });
        let mut fixed = [0u8; 32];
        fixed.copy_from_slice(key);
        self.encryption_key = Some(fixed);
        Ok(())
    }

    /// Enable per-tag records in the report.
    pub fn set_detailed_reporting(&mut self, enable: bool) {
        self.detailed_reporting = enable;
    }

    /// The merged action table: profile entries
    /// overridden by custom actions.
    pub fn effective_actions(&self) -> BTreeMap<Tag, TagAction> {
        let mut table = profile_actions(self.profile);
        for (tag, action) in &self.custom_actions {
            table.insert(*tag, action.clone());
        }
        table
    }

    /// De-identify the dataset in place.
    ///
    /// All `ReplaceUid` actions of one call see the same mapping;
    /// when no mapping is supplied, an ephemeral one keeps the
    /// call internally consistent.
    /// Per-tag failures are collected into the report and do not
    /// stop the remaining actions.
    pub fn anonymize(
        &self,
        dataset: &mut InMemObject,
        mapping: Option<&UidMapping>,
    ) -> AnonymizationReport {
        let mut report = AnonymizationReport::new(self.profile, self.date_offset_days);
        let ephemeral;
        let mapping = match mapping {
            Some(mapping) => mapping,
            None => {
                ephemeral = UidMapping::default();
                report
                    .warnings
                    .push("no UID mapping supplied; remapping is not reusable".to_string());
                &ephemeral
            }
        };

        if self.profile == AnonymizationProfile::CleanPixel
            && dataset.contains(tags::PIXEL_DATA)
        {
            report.warnings.push(
                "pixel data left untouched; burned-in annotation removal requires an external step"
                    .to_string(),
            );
        }

        for (tag, action) in self.effective_actions() {
            if !dataset.contains(tag) {
                continue;
            }
            self.apply(dataset, tag, &action, mapping, &mut report);
        }

        report
    }

    fn apply(
        &self,
        dataset: &mut InMemObject,
        tag: Tag,
        action: &TagAction,
        mapping: &UidMapping,
        report: &mut AnonymizationReport,
    ) {
        let mut record = |report: &mut AnonymizationReport, action: &'static str| {
            if self.detailed_reporting {
                report.details.push(TagActionRecord { tag, action });
            }
        };

        match action {
            TagAction::Remove | TagAction::RemoveOrEmpty => {
                dataset.remove(tag);
                report.tags_removed += 1;
                record(report, "remove");
            }
            TagAction::Empty => {
                let vr = dataset.get(tag).map(|e| e.vr()).unwrap_or(pacs_core::VR::LO);
                dataset.put(DataElement::empty(tag, vr));
                report.tags_emptied += 1;
                record(report, "empty");
            }
            TagAction::Keep => {
                report.tags_kept += 1;
                record(report, "keep");
            }
            TagAction::Replace(value) => {
                let vr = dataset.get(tag).map(|e| e.vr()).unwrap_or(pacs_core::VR::LO);
                dataset.put_str(tag, vr, value.clone());
                report.tags_replaced += 1;
                record(report, "replace");
            }
            TagAction::ReplaceUid => {
                if let Some(original) = dataset.string_opt(tag) {
                    let anonymized = mapping.get_or_create(&original);
                    dataset.put_str(tag, pacs_core::VR::UI, anonymized);
                    report.uids_remapped += 1;
                    record(report, "replace_uid");
                }
            }
            TagAction::Hash => {
                if let Some(value) = dataset.string_opt(tag) {
                    let vr = dataset.get(tag).map(|e| e.vr()).unwrap_or(pacs_core::VR::LO);
                    dataset.put_str(tag, vr, self.hash_value(&value));
                    report.tags_hashed += 1;
                    record(report, "hash");
                }
            }
            TagAction::Encrypt => match self.encryption_key {
                Some(key) => {
                    let value = dataset.string_opt(tag).unwrap_or_default();
                    match encrypt_value(&key, value.as_bytes()) {
                        Ok(ciphertext) => {
                            let vr =
                                dataset.get(tag).map(|e| e.vr()).unwrap_or(pacs_core::VR::LT);
                            dataset.put_str(tag, vr, ciphertext);
                            report.tags_encrypted += 1;
                            record(report, "encrypt");
                        }
                        Err(message) => {
                            report
                                .errors
                                .push(format!("could not encrypt {}: {}", tag, message));
                        }
                    }
                }
                None => {
                    report
                        .errors
                        .push(format!("no encryption key configured for {}", tag));
                }
            },
            TagAction::ShiftDate => {
                let value = dataset.string_opt(tag).unwrap_or_default();
                if value.is_empty() {
                    // empty dates stay empty
                    return;
                }
                let offset = match self.date_offset_days {
                    Some(offset) => offset,
                    None => {
                        // without an offset the date cannot be kept
                        dataset.put(DataElement::empty(tag, pacs_core::VR::DA));
                        report.tags_emptied += 1;
                        record(report, "empty");
                        return;
                    }
                };
                match parse_date(&value) {
                    Ok(date) => {
                        let shifted = date + Duration::days(offset);
                        dataset.put_str(tag, pacs_core::VR::DA, format_date(shifted));
                        report.dates_shifted += 1;
                        record(report, "shift_date");
                    }
                    Err(e) => {
                        report
                            .errors
                            .push(format!("unparseable date in {}: {}", tag, e));
                    }
                }
            }
        }
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        if let Some(salt) = &self.hash_salt {
            hasher.update(salt.as_bytes());
        }
        hasher.update(value.as_bytes());
        hex_encode(&hasher.finalize())
    }
}

/// AES-256-GCM encryption: the output is
/// `hex(nonce || ciphertext-and-tag)`.
fn encrypt_value(key: &[u8; 32], plaintext: &[u8]) -> Result<String, String> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| e.to_string())?;
    let nonce_bytes: [u8; 12] = rand::thread_rng().gen();
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| e.to_string())?;
    let mut out = Vec::with_capacity(12 + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(hex_encode(&out))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::Anonymizer;
    use crate::actions::TagAction;
    use crate::profile::AnonymizationProfile;
    use crate::uid_mapping::UidMapping;
    use pacs_core::{Tag, VR};
    use pacs_dictionary_std::tags;
    use pacs_object::InMemObject;

    fn patient_dataset() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        obj.put_str(tags::PATIENT_ID, VR::LO, "12345");
        obj.put_str(tags::PATIENT_BIRTH_DATE, VR::DA, "19800115");
        obj.put_str(tags::INSTITUTION_NAME, VR::LO, "General Hospital");
        obj.put_str(tags::STUDY_INSTANCE_UID, VR::UI, "1.2.3");
        obj.put_str(tags::STUDY_DATE, VR::DA, "20240115");
        obj
    }

    #[test]
    fn hipaa_safe_harbor_hides_identity() {
        let engine = Anonymizer::new(AnonymizationProfile::HipaaSafeHarbor);
        let mapping = UidMapping::default();
        let mut dataset = patient_dataset();
        let report = engine.anonymize(&mut dataset, Some(&mapping));

        assert_ne!(dataset.string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
        assert_ne!(dataset.string(tags::PATIENT_ID).unwrap(), "12345");
        assert_eq!(dataset.string(tags::PATIENT_BIRTH_DATE).unwrap(), "");
        assert_eq!(dataset.string(tags::INSTITUTION_NAME).unwrap(), "");

        let anonymized_uid = dataset.string(tags::STUDY_INSTANCE_UID).unwrap().to_string();
        assert_ne!(anonymized_uid, "1.2.3");
        assert_eq!(mapping.get_original(&anonymized_uid).as_deref(), Some("1.2.3"));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn date_shift_crosses_year_boundary() {
        let mut engine = Anonymizer::new(AnonymizationProfile::RetainLongitudinal);
        engine.set_date_offset(-15);
        let mut dataset = InMemObject::new_empty();
        dataset.put_str(tags::STUDY_DATE, VR::DA, "20240115");
        let report = engine.anonymize(&mut dataset, None);
        assert_eq!(dataset.string(tags::STUDY_DATE).unwrap(), "20231231");
        assert_eq!(report.dates_shifted, 1);
    }

    #[test]
    fn date_shift_handles_leap_day() {
        let mut engine = Anonymizer::new(AnonymizationProfile::RetainLongitudinal);
        engine.set_date_offset(1);
        let mut dataset = InMemObject::new_empty();
        dataset.put_str(tags::STUDY_DATE, VR::DA, "20240228");
        engine.anonymize(&mut dataset, None);
        assert_eq!(dataset.string(tags::STUDY_DATE).unwrap(), "20240229");
    }

    #[test]
    fn shift_without_offset_degrades_to_empty() {
        let engine = Anonymizer::new(AnonymizationProfile::RetainLongitudinal);
        let mut dataset = InMemObject::new_empty();
        dataset.put_str(tags::STUDY_DATE, VR::DA, "20240115");
        let report = engine.anonymize(&mut dataset, None);
        assert_eq!(dataset.string(tags::STUDY_DATE).unwrap(), "");
        assert_eq!(report.tags_emptied, 1);
    }

    #[test]
    fn unparseable_date_is_collected_not_fatal() {
        let mut engine = Anonymizer::new(AnonymizationProfile::RetainLongitudinal);
        engine.set_date_offset(-15);
        let mut dataset = patient_dataset();
        dataset.put_str(tags::STUDY_DATE, VR::DA, "not-a-date");
        let report = engine.anonymize(&mut dataset, None);
        assert!(!report.errors.is_empty());
        // the remaining actions still ran
        assert_ne!(dataset.string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
    }

    #[test]
    fn custom_actions_override_profile() {
        let mut engine = Anonymizer::new(AnonymizationProfile::Basic);
        engine.add_tag_action(tags::PATIENT_NAME, TagAction::Keep);
        let mut dataset = patient_dataset();
        engine.anonymize(&mut dataset, None);
        assert_eq!(dataset.string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
    }

    #[test]
    fn hashing_is_salted_and_stable() {
        let mut engine = Anonymizer::new(AnonymizationProfile::Basic);
        engine.set_hash_salt("pepper");
        let mut first = patient_dataset();
        let mut second = patient_dataset();
        engine.anonymize(&mut first, None);
        engine.anonymize(&mut second, None);
        let a = first.string(tags::PATIENT_ID).unwrap().to_string();
        let b = second.string(tags::PATIENT_ID).unwrap().to_string();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut unsalted_engine = Anonymizer::new(AnonymizationProfile::Basic);
        unsalted_engine.set_hash_salt("different");
        let mut third = patient_dataset();
        unsalted_engine.anonymize(&mut third, None);
        assert_ne!(third.string(tags::PATIENT_ID).unwrap(), a);
    }

    #[test]
    fn encryption_requires_a_key() {
        let mut engine = Anonymizer::new(AnonymizationProfile::Basic);
        engine.add_tag_action(tags::ACCESSION_NUMBER, TagAction::Encrypt);
        let mut dataset = patient_dataset();
        dataset.put_str(tags::ACCESSION_NUMBER, VR::SH, "ACC123");
        let report = engine.anonymize(&mut dataset, None);
        assert!(!report.errors.is_empty());

        let mut keyed = Anonymizer::new(AnonymizationProfile::Basic);
        keyed.add_tag_action(tags::ACCESSION_NUMBER, TagAction::Encrypt);
        keyed.set_encryption_key(&[7u8; 32]).unwrap();
        let mut dataset = patient_dataset();
        dataset.put_str(tags::ACCESSION_NUMBER, VR::SH, "ACC123");
        let report = keyed.anonymize(&mut dataset, None);
        assert_eq!(report.tags_encrypted, 1);
        let value = dataset.string(tags::ACCESSION_NUMBER).unwrap().to_string();
        assert!(value.len() > 24 && value.bytes().all(|b| b.is_ascii_hexdigit()));

        assert!(keyed.set_encryption_key(&[0u8; 16]).is_err());
    }

    #[test]
    fn replace_uid_consistent_within_one_call() {
        let engine = Anonymizer::new(AnonymizationProfile::Basic);
        let mapping = UidMapping::default();
        let mut first = patient_dataset();
        let mut second = patient_dataset();
        engine.anonymize(&mut first, Some(&mapping));
        engine.anonymize(&mut second, Some(&mapping));
        assert_eq!(
            first.string(tags::STUDY_INSTANCE_UID).unwrap(),
            second.string(tags::STUDY_INSTANCE_UID).unwrap()
        );
    }

    #[test]
    fn detailed_reporting_lists_tags() {
        let mut engine = Anonymizer::new(AnonymizationProfile::Basic);
        engine.set_detailed_reporting(true);
        let mut dataset = patient_dataset();
        let report = engine.anonymize(&mut dataset, None);
        assert!(!report.details.is_empty());
        assert!(report
            .details
            .iter()
            .any(|r| r.tag == Tag(0x0010, 0x0010)));
    }
}
