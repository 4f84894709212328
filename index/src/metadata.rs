//! Selective metadata retrieval.
//!
//! Callers ask for explicit tags and/or a preset bundle;
//! attributes backed by the index are answered from the catalog,
//! anything else is read from the stored file.

use crate::catalog::InstanceIndex;
use pacs_core::{Tag, VR};
use pacs_dictionary_std::tags;
use pacs_object::{DataElement, FileObject, InMemObject, ReadOptions};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};

/// A metadata retrieval failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("no such instance {}", sop_instance_uid))]
    UnknownInstance {
        sop_instance_uid: String,
        backtrace: Backtrace,
    },
    #[snafu(display("could not open stored object"))]
    OpenStored {
        #[snafu(backtrace)]
        source: pacs_object::file::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A preset bundle of frequently requested tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataPreset {
    ImageDisplay,
    WindowLevel,
    PatientInfo,
    Acquisition,
    Positioning,
    Multiframe,
}

impl MetadataPreset {
    /// Resolve a preset by its request name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "image_display" => Some(MetadataPreset::ImageDisplay),
            "window_level" => Some(MetadataPreset::WindowLevel),
            "patient_info" => Some(MetadataPreset::PatientInfo),
            "acquisition" => Some(MetadataPreset::Acquisition),
            "positioning" => Some(MetadataPreset::Positioning),
            "multiframe" => Some(MetadataPreset::Multiframe),
            _ => None,
        }
    }

    /// The tags this preset expands to.
    pub fn tags(self) -> &'static [Tag] {
        match self {
            MetadataPreset::ImageDisplay => &[
                tags::ROWS,
                tags::COLUMNS,
                tags::BITS_ALLOCATED,
                tags::BITS_STORED,
                tags::HIGH_BIT,
                tags::PIXEL_REPRESENTATION,
                tags::SAMPLES_PER_PIXEL,
                tags::PHOTOMETRIC_INTERPRETATION,
                tags::PIXEL_SPACING,
            ],
            MetadataPreset::WindowLevel => &[
                tags::WINDOW_CENTER,
                tags::WINDOW_WIDTH,
                tags::WINDOW_CENTER_WIDTH_EXPLANATION,
                tags::RESCALE_INTERCEPT,
                tags::RESCALE_SLOPE,
            ],
            MetadataPreset::PatientInfo => &[
                tags::PATIENT_NAME,
                tags::PATIENT_ID,
                tags::PATIENT_BIRTH_DATE,
                tags::PATIENT_SEX,
                tags::PATIENT_AGE,
            ],
            MetadataPreset::Acquisition => &[
                tags::MODALITY,
                tags::KVP,
                tags::SLICE_THICKNESS,
                tags::REPETITION_TIME,
                tags::ECHO_TIME,
                tags::PROTOCOL_NAME,
                tags::BODY_PART_EXAMINED,
                tags::ACQUISITION_DATE,
                tags::ACQUISITION_TIME,
            ],
            MetadataPreset::Positioning => &[
                tags::IMAGE_POSITION_PATIENT,
                tags::IMAGE_ORIENTATION_PATIENT,
                tags::SLICE_LOCATION,
                tags::PATIENT_POSITION,
                tags::FRAME_OF_REFERENCE_UID,
            ],
            MetadataPreset::Multiframe => &[
                tags::NUMBER_OF_FRAMES,
                tags::ROWS,
                tags::COLUMNS,
                tags::BITS_ALLOCATED,
            ],
        }
    }
}

/// A selective metadata request.
#[derive(Debug, Default, Clone)]
pub struct MetadataRequest {
    /// individual tags to return
    pub explicit_tags: Vec<Tag>,
    /// a preset bundle to add to the set
    pub preset: Option<MetadataPreset>,
    /// whether private tags may be returned
    pub include_private: bool,
}

impl MetadataRequest {
    fn requested_tags(&self) -> Vec<Tag> {
        let mut requested = self.explicit_tags.clone();
        if let Some(preset) = self.preset {
            requested.extend_from_slice(preset.tags());
        }
        requested.sort();
        requested.dedup();
        if !self.include_private {
            requested.retain(|tag| !tag.is_private());
        }
        requested
    }
}

/// Which tags the index can answer without opening the file.
fn index_backed(tag: Tag) -> bool {
    tag == tags::SOP_INSTANCE_UID
        || tag == tags::SOP_CLASS_UID
        || tag == tags::SERIES_INSTANCE_UID
        || tag == tags::STUDY_INSTANCE_UID
        || tag == tags::PATIENT_ID
        || tag == tags::PATIENT_NAME
        || tag == tags::MODALITY
        || tag == tags::STUDY_DATE
        || tag == tags::SERIES_NUMBER
        || tag == tags::INSTANCE_NUMBER
        || tag == tags::SLICE_LOCATION
        || tag == tags::IMAGE_POSITION_PATIENT
        || tag == tags::ACQUISITION_TIME
}

/// Retrieve the requested attributes of one stored instance.
///
/// The returned dataset carries only the requested tags
/// (absent attributes are simply not included).
pub fn retrieve(
    index: &InstanceIndex,
    sop_instance_uid: &str,
    request: &MetadataRequest,
) -> Result<InMemObject> {
    let record = index.get(sop_instance_uid).context(UnknownInstanceSnafu {
        sop_instance_uid,
    })?;
    let requested = request.requested_tags();

    let mut out = InMemObject::new_empty();
    let needs_file = requested.iter().any(|&tag| !index_backed(tag));

    if needs_file {
        // one file read covers every requested tag
        let file = FileObject::open_file_with(
            &record.file_path,
            ReadOptions {
                allow_missing_preamble: true,
            },
        )
        .context(OpenStoredSnafu)?;
        for &tag in &requested {
            if let Some(element) = file.dataset().get(tag) {
                out.put(element.clone());
            }
        }
        return Ok(out);
    }

    for &tag in &requested {
        if tag == tags::SOP_INSTANCE_UID {
            out.put_str(tag, VR::UI, record.sop_instance_uid.clone());
        } else if tag == tags::SOP_CLASS_UID {
            out.put_str(tag, VR::UI, record.sop_class_uid.clone());
        } else if tag == tags::SERIES_INSTANCE_UID {
            out.put_str(tag, VR::UI, record.series_instance_uid.clone());
        } else if tag == tags::STUDY_INSTANCE_UID {
            out.put_str(tag, VR::UI, record.study_instance_uid.clone());
        } else if tag == tags::PATIENT_ID {
            out.put_str(tag, VR::LO, record.patient_id.clone());
        } else if tag == tags::PATIENT_NAME {
            out.put_str(tag, VR::PN, record.patient_name.clone());
        } else if tag == tags::MODALITY {
            out.put_str(tag, VR::CS, record.modality.clone());
        } else if tag == tags::STUDY_DATE {
            if let Some(date) = &record.study_date {
                out.put_str(tag, VR::DA, date.clone());
            }
        } else if tag == tags::SERIES_NUMBER {
            if let Some(number) = record.series_number {
                out.put_str(tag, VR::IS, number.to_string());
            }
        } else if tag == tags::INSTANCE_NUMBER {
            if let Some(number) = record.instance_number {
                out.put_str(tag, VR::IS, number.to_string());
            }
        } else if tag == tags::SLICE_LOCATION {
            if let Some(location) = record.slice_location {
                out.put_str(tag, VR::DS, location.to_string());
            }
        } else if tag == tags::IMAGE_POSITION_PATIENT {
            if let Some(position) = record.image_position_patient {
                let value: Vec<String> = position.iter().map(f64::to_string).collect();
                out.put(DataElement::new(
                    tag,
                    VR::DS,
                    pacs_core::PrimitiveValue::from(value),
                ));
            }
        } else if tag == tags::ACQUISITION_TIME {
            if let Some(time) = &record.acquisition_time {
                out.put_str(tag, VR::TM, time.clone());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{retrieve, MetadataPreset, MetadataRequest};
    use crate::catalog::InstanceIndex;
    use crate::record::IndexRecord;
    use chrono::Utc;
    use pacs_core::Tag;
    use pacs_dictionary_std::tags;
    use std::path::PathBuf;

    fn indexed() -> InstanceIndex {
        let index = InstanceIndex::new_in_memory();
        index
            .upsert(IndexRecord {
                sop_instance_uid: "1.2.3.4.5".to_string(),
                sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
                series_instance_uid: "1.2.3.1".to_string(),
                study_instance_uid: "1.2.3".to_string(),
                patient_id: "123".to_string(),
                patient_name: "DOE^JOHN".to_string(),
                modality: "CT".to_string(),
                study_date: Some("20240115".to_string()),
                series_number: Some(2),
                instance_number: Some(14),
                slice_location: Some(-12.5),
                image_position_patient: Some([0.0, 0.0, -12.5]),
                acquisition_time: Some("101530".to_string()),
                transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
                file_path: PathBuf::from("/nonexistent/file.dcm"),
                bytes_on_disk: 2048,
                received_at: Utc::now(),
            })
            .unwrap();
        index
    }

    #[test]
    fn index_backed_tags_avoid_the_file() {
        // the backing path does not exist, so a file read would fail
        let index = indexed();
        let request = MetadataRequest {
            explicit_tags: vec![tags::PATIENT_NAME, tags::MODALITY, tags::INSTANCE_NUMBER],
            preset: None,
            include_private: false,
        };
        let out = retrieve(&index, "1.2.3.4.5", &request).unwrap();
        assert_eq!(out.string(tags::PATIENT_NAME).unwrap(), "DOE^JOHN");
        assert_eq!(out.string(tags::MODALITY).unwrap(), "CT");
        assert_eq!(out.string(tags::INSTANCE_NUMBER).unwrap(), "14");
    }

    #[test]
    fn file_backed_tags_require_the_file() {
        let index = indexed();
        let request = MetadataRequest {
            explicit_tags: vec![],
            preset: Some(MetadataPreset::WindowLevel),
            include_private: false,
        };
        // window/level presets are not index-backed and the path
        // is absent, so the retrieval must fail loudly
        assert!(retrieve(&index, "1.2.3.4.5", &request).is_err());
    }

    #[test]
    fn private_tags_are_filtered_by_default() {
        let request = MetadataRequest {
            explicit_tags: vec![Tag(0x0009, 0x1001), tags::MODALITY],
            preset: None,
            include_private: false,
        };
        assert_eq!(request.requested_tags(), vec![tags::MODALITY]);
    }

    #[test]
    fn unknown_instance_is_an_error() {
        let index = indexed();
        let request = MetadataRequest::default();
        assert!(retrieve(&index, "9.9.9", &request).is_err());
    }

    #[test]
    fn preset_names_resolve() {
        assert_eq!(
            MetadataPreset::from_name("window_level"),
            Some(MetadataPreset::WindowLevel)
        );
        assert_eq!(MetadataPreset::from_name("bogus"), None);
    }
}
