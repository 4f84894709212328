//! The index record: the attributes of one stored SOP instance
//! projected out for query answering.

use chrono::{DateTime, Utc};
use pacs_dictionary_std::tags;
use pacs_object::InMemObject;
use serde::{Deserialize, Serialize};
use snafu::{Backtrace, OptionExt, Snafu};
use std::path::PathBuf;

/// A required identifying attribute was absent from the dataset.
#[derive(Debug, Snafu)]
#[snafu(display("dataset has no {}", name))]
pub struct MissingAttributeError {
    name: &'static str,
    backtrace: Backtrace,
}

/// The catalog entry of one stored SOP instance.
///
/// The catalog is the source of truth for queries:
/// `file_path` must resolve to a file whose identifying UIDs
/// match this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub sop_instance_uid: String,
    pub sop_class_uid: String,
    pub series_instance_uid: String,
    pub study_instance_uid: String,
    pub patient_id: String,
    /// canonical form of the patient name (uppercase, trimmed)
    pub patient_name: String,
    pub modality: String,
    /// `YYYYMMDD`, when present in the object
    pub study_date: Option<String>,
    pub series_number: Option<i32>,
    pub instance_number: Option<i32>,
    pub slice_location: Option<f64>,
    /// the x/y/z patient position of the first voxel
    pub image_position_patient: Option<[f64; 3]>,
    /// `HHMMSS` fraction-tolerant, when present
    pub acquisition_time: Option<String>,
    pub transfer_syntax: String,
    pub file_path: PathBuf,
    pub bytes_on_disk: u64,
    pub received_at: DateTime<Utc>,
}

/// Normalize a person name for indexing:
/// trailing empty components are dropped and case is folded.
pub fn canonical_person_name(name: &str) -> String {
    name.trim()
        .trim_end_matches('^')
        .to_uppercase()
}

impl IndexRecord {
    /// Project a decoded dataset into an index record.
    ///
    /// The three identifying UIDs are required;
    /// everything else degrades to empty or absent.
    pub fn from_dataset(
        dataset: &InMemObject,
        transfer_syntax: &str,
        file_path: PathBuf,
        bytes_on_disk: u64,
        received_at: DateTime<Utc>,
    ) -> Result<IndexRecord, MissingAttributeError> {
        let sop_instance_uid = dataset
            .string_opt(tags::SOP_INSTANCE_UID)
            .context(MissingAttributeSnafu {
                name: "SOPInstanceUID",
            })?;
        let series_instance_uid = dataset
            .string_opt(tags::SERIES_INSTANCE_UID)
            .context(MissingAttributeSnafu {
                name: "SeriesInstanceUID",
            })?;
        let study_instance_uid = dataset
            .string_opt(tags::STUDY_INSTANCE_UID)
            .context(MissingAttributeSnafu {
                name: "StudyInstanceUID",
            })?;

        let image_position_patient = dataset
            .get(tags::IMAGE_POSITION_PATIENT)
            .and_then(|e| e.to_multi_f64().ok())
            .and_then(|v| {
                if v.len() >= 3 {
                    Some([v[0], v[1], v[2]])
                } else {
                    None
                }
            });

        Ok(IndexRecord {
            sop_instance_uid,
            sop_class_uid: dataset.string_opt(tags::SOP_CLASS_UID).unwrap_or_default(),
            series_instance_uid,
            study_instance_uid,
            patient_id: dataset.string_opt(tags::PATIENT_ID).unwrap_or_default(),
            patient_name: dataset
                .string_opt(tags::PATIENT_NAME)
                .map(|name| canonical_person_name(&name))
                .unwrap_or_default(),
            modality: dataset.string_opt(tags::MODALITY).unwrap_or_default(),
            study_date: dataset.string_opt(tags::STUDY_DATE),
            series_number: dataset
                .get(tags::SERIES_NUMBER)
                .and_then(|e| e.to_int().ok()),
            instance_number: dataset
                .get(tags::INSTANCE_NUMBER)
                .and_then(|e| e.to_int().ok()),
            slice_location: dataset
                .get(tags::SLICE_LOCATION)
                .and_then(|e| e.to_f64().ok()),
            image_position_patient,
            acquisition_time: dataset.string_opt(tags::ACQUISITION_TIME),
            transfer_syntax: transfer_syntax.to_string(),
            file_path,
            bytes_on_disk,
            received_at,
        })
    }

    /// The z-coordinate used for spatial series ordering:
    /// the third component of the image position,
    /// falling back to the slice location.
    pub fn z_position(&self) -> Option<f64> {
        self.image_position_patient
            .map(|p| p[2])
            .or(self.slice_location)
    }
}

#[cfg(test)]
mod tests {
    use super::{canonical_person_name, IndexRecord};
    use chrono::Utc;
    use pacs_core::{PrimitiveValue, VR};
    use pacs_dictionary_std::tags;
    use pacs_object::{DataElement, InMemObject};
    use std::path::PathBuf;

    fn minimal_ct() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
        obj.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
        obj.put_str(tags::STUDY_INSTANCE_UID, VR::UI, "1.2.3");
        obj.put_str(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.1");
        obj.put_str(tags::PATIENT_ID, VR::LO, "123");
        obj.put_str(tags::PATIENT_NAME, VR::PN, "doe^john^^");
        obj.put_str(tags::MODALITY, VR::CS, "CT");
        obj.put_str(tags::STUDY_DATE, VR::DA, "20240115");
        obj.put(DataElement::new(
            tags::IMAGE_POSITION_PATIENT,
            VR::DS,
            PrimitiveValue::from(vec!["0.0".to_owned(), "0.0".to_owned(), "-12.5".to_owned()]),
        ));
        obj
    }

    #[test]
    fn projection_from_dataset() {
        let record = IndexRecord::from_dataset(
            &minimal_ct(),
            "1.2.840.10008.1.2.1",
            PathBuf::from("/data/1_2_3_4_5.dcm"),
            1024,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.sop_instance_uid, "1.2.3.4.5");
        assert_eq!(record.patient_name, "DOE^JOHN");
        assert_eq!(record.study_date.as_deref(), Some("20240115"));
        assert_eq!(record.z_position(), Some(-12.5));
    }

    #[test]
    fn missing_uid_is_an_error() {
        let mut obj = minimal_ct();
        obj.remove(tags::STUDY_INSTANCE_UID);
        let err = IndexRecord::from_dataset(
            &obj,
            "1.2.840.10008.1.2.1",
            PathBuf::from("x.dcm"),
            0,
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("StudyInstanceUID"));
    }

    #[test]
    fn person_name_canonicalization() {
        assert_eq!(canonical_person_name("doe^john^^"), "DOE^JOHN");
        assert_eq!(canonical_person_name(" Doe^Jane "), "DOE^JANE");
    }
}
