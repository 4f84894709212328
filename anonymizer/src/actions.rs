//! Per-tag de-identification actions and the profile tables.

use crate::profile::AnonymizationProfile;
use pacs_core::Tag;
use pacs_dictionary_std::tags;
use std::collections::BTreeMap;

/// What to do with one attribute during de-identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagAction {
    /// Drop the element.
    Remove,
    /// Keep the element with a zero-length value.
    Empty,
    /// Drop the element (the standard allows emptying instead
    /// where type requirements demand presence).
    RemoveOrEmpty,
    /// Leave the element untouched.
    Keep,
    /// Replace the value with a fixed string.
    Replace(String),
    /// Replace the UID through the association's mapping.
    ReplaceUid,
    /// Replace the value with a salted hash of itself.
    Hash,
    /// Replace the value with its AES-GCM ciphertext, hex encoded.
    Encrypt,
    /// Shift a DA value by the configured day offset.
    ShiftDate,
}

/// The action table of a profile.
pub fn profile_actions(profile: AnonymizationProfile) -> BTreeMap<Tag, TagAction> {
    use AnonymizationProfile::*;
    let mut table = basic_table();
    match profile {
        Basic | CleanPixel => {}
        CleanDescriptions => {
            add_description_cleaning(&mut table);
        }
        RetainLongitudinal => {
            for tag in date_tags() {
                table.insert(tag, TagAction::ShiftDate);
            }
        }
        RetainPatientCharacteristics => {
            table.insert(tags::PATIENT_SEX, TagAction::Keep);
            table.insert(tags::PATIENT_AGE, TagAction::Keep);
            table.insert(tags::PATIENT_SIZE, TagAction::Keep);
            table.insert(tags::PATIENT_WEIGHT, TagAction::Keep);
            table.insert(tags::ETHNIC_GROUP, TagAction::Keep);
        }
        HipaaSafeHarbor => {
            add_description_cleaning(&mut table);
            // all dates more precise than the year must go
            for tag in date_tags() {
                table.insert(tag, TagAction::Empty);
            }
            for tag in time_tags() {
                table.insert(tag, TagAction::Empty);
            }
            table.insert(tags::DEVICE_SERIAL_NUMBER, TagAction::Remove);
            table.insert(tags::STATION_NAME, TagAction::Remove);
            table.insert(tags::INSTITUTIONAL_DEPARTMENT_NAME, TagAction::Remove);
        }
        GdprCompliant => {
            add_description_cleaning(&mut table);
            // pseudonymize rather than destroy: identifiers stay
            // linkable through the separately held mapping
            table.insert(tags::PATIENT_ID, TagAction::Hash);
            table.insert(tags::ACCESSION_NUMBER, TagAction::Hash);
            for tag in date_tags() {
                table.insert(tag, TagAction::ShiftDate);
            }
        }
    }
    table
}

fn basic_table() -> BTreeMap<Tag, TagAction> {
    let mut table = BTreeMap::new();

    // direct patient identifiers
    table.insert(
        tags::PATIENT_NAME,
        TagAction::Replace("ANONYMOUS".to_string()),
    );
    table.insert(tags::PATIENT_ID, TagAction::Hash);
    table.insert(tags::PATIENT_BIRTH_DATE, TagAction::Empty);
    table.insert(tags::PATIENT_BIRTH_TIME, TagAction::Remove);
    table.insert(tags::PATIENT_ADDRESS, TagAction::Remove);
    table.insert(tags::PATIENT_TELEPHONE_NUMBERS, TagAction::Remove);
    table.insert(tags::OTHER_PATIENT_IDS, TagAction::Remove);
    table.insert(tags::OTHER_PATIENT_NAMES, TagAction::Remove);
    table.insert(tags::PATIENT_MOTHER_BIRTH_NAME, TagAction::Remove);
    table.insert(tags::MEDICAL_RECORD_LOCATOR, TagAction::Remove);
    table.insert(tags::ISSUER_OF_PATIENT_ID, TagAction::Remove);
    table.insert(tags::PATIENT_AGE, TagAction::Remove);
    table.insert(tags::PATIENT_SIZE, TagAction::Remove);
    table.insert(tags::PATIENT_WEIGHT, TagAction::Remove);
    table.insert(tags::ETHNIC_GROUP, TagAction::Remove);
    table.insert(tags::PATIENT_COMMENTS, TagAction::Remove);
    table.insert(tags::ADDITIONAL_PATIENT_HISTORY, TagAction::Remove);

    // institution and staff
    table.insert(tags::ACCESSION_NUMBER, TagAction::Empty);
    table.insert(tags::INSTITUTION_NAME, TagAction::Empty);
    table.insert(tags::INSTITUTION_ADDRESS, TagAction::Remove);
    table.insert(tags::REFERRING_PHYSICIAN_NAME, TagAction::Empty);
    table.insert(
        tags::REFERRING_PHYSICIAN_TELEPHONE_NUMBERS,
        TagAction::Remove,
    );
    table.insert(tags::PERFORMING_PHYSICIAN_NAME, TagAction::Remove);
    table.insert(tags::NAME_OF_PHYSICIANS_READING_STUDY, TagAction::Remove);
    table.insert(tags::OPERATORS_NAME, TagAction::Remove);
    table.insert(tags::PHYSICIANS_OF_RECORD, TagAction::Remove);
    table.insert(tags::REQUESTING_PHYSICIAN, TagAction::Remove);

    // visit context
    table.insert(tags::ADMISSION_ID, TagAction::Remove);
    table.insert(tags::CURRENT_PATIENT_LOCATION, TagAction::Remove);

    // identifiers that must stay consistent across objects
    table.insert(tags::STUDY_INSTANCE_UID, TagAction::ReplaceUid);
    table.insert(tags::SERIES_INSTANCE_UID, TagAction::ReplaceUid);
    table.insert(tags::SOP_INSTANCE_UID, TagAction::ReplaceUid);
    table.insert(tags::FRAME_OF_REFERENCE_UID, TagAction::ReplaceUid);

    table
}

fn add_description_cleaning(table: &mut BTreeMap<Tag, TagAction>) {
    table.insert(tags::STUDY_DESCRIPTION, TagAction::Empty);
    table.insert(tags::SERIES_DESCRIPTION, TagAction::Empty);
    table.insert(tags::IMAGE_COMMENTS, TagAction::Remove);
    table.insert(tags::DERIVATION_DESCRIPTION, TagAction::Remove);
    table.insert(
        tags::REQUESTED_PROCEDURE_DESCRIPTION,
        TagAction::Empty,
    );
    table.insert(tags::PROTOCOL_NAME, TagAction::Empty);
}

fn date_tags() -> [Tag; 5] {
    [
        tags::STUDY_DATE,
        tags::SERIES_DATE,
        tags::ACQUISITION_DATE,
        tags::CONTENT_DATE,
        tags::PATIENT_BIRTH_DATE,
    ]
}

fn time_tags() -> [Tag; 4] {
    [
        tags::STUDY_TIME,
        tags::SERIES_TIME,
        tags::ACQUISITION_TIME,
        tags::CONTENT_TIME,
    ]
}
