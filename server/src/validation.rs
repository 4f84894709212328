//! Modality-aware IOD validation of incoming objects.

use pacs_core::Tag;
use pacs_dictionary_std::tags;
use pacs_object::InMemObject;
use std::fmt;

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub tag: Tag,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.severity, self.tag, self.message)
    }
}

/// The findings of one validation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether any finding is an error.
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Error)
    }

    /// Whether any finding is at least a warning.
    pub fn has_warnings(&self) -> bool {
        !self.issues.is_empty()
    }

    fn error(&mut self, tag: Tag, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            tag,
            message: message.into(),
        });
    }

    fn warning(&mut self, tag: Tag, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            tag,
            message: message.into(),
        });
    }
}

fn require(report: &mut ValidationReport, dataset: &InMemObject, tag: Tag, name: &str) {
    if dataset.string_opt(tag).is_none() {
        report.error(tag, format!("required attribute {} is missing", name));
    }
}

fn expect(report: &mut ValidationReport, dataset: &InMemObject, tag: Tag, name: &str) {
    if dataset.string_opt(tag).is_none() {
        report.warning(tag, format!("attribute {} should be present", name));
    }
}

fn require_pixel_module(report: &mut ValidationReport, dataset: &InMemObject) {
    for (tag, name) in [
        (tags::ROWS, "Rows"),
        (tags::COLUMNS, "Columns"),
        (tags::BITS_ALLOCATED, "BitsAllocated"),
    ] {
        if dataset.get(tag).is_none() {
            report.error(tag, format!("image object without {}", name));
        }
    }
    if !dataset.contains(tags::PIXEL_DATA) {
        report.error(tags::PIXEL_DATA, "image object without PixelData");
    }
}

/// Validate the composite object against the expectations of its
/// modality. The caller decides which severity refuses the store.
pub fn validate(dataset: &InMemObject) -> ValidationReport {
    let mut report = ValidationReport::default();

    // identifying attributes every composite object needs
    require(&mut report, dataset, tags::SOP_CLASS_UID, "SOPClassUID");
    require(&mut report, dataset, tags::SOP_INSTANCE_UID, "SOPInstanceUID");
    require(
        &mut report,
        dataset,
        tags::STUDY_INSTANCE_UID,
        "StudyInstanceUID",
    );
    require(
        &mut report,
        dataset,
        tags::SERIES_INSTANCE_UID,
        "SeriesInstanceUID",
    );
    expect(&mut report, dataset, tags::PATIENT_ID, "PatientID");
    expect(&mut report, dataset, tags::MODALITY, "Modality");

    let modality = dataset.string_opt(tags::MODALITY).unwrap_or_default();
    match modality.as_str() {
        "CT" => {
            require_pixel_module(&mut report, dataset);
            expect(&mut report, dataset, tags::KVP, "KVP");
            expect(
                &mut report,
                dataset,
                tags::IMAGE_POSITION_PATIENT,
                "ImagePositionPatient",
            );
        }
        "MR" => {
            require_pixel_module(&mut report, dataset);
            expect(
                &mut report,
                dataset,
                tags::SCANNING_SEQUENCE,
                "ScanningSequence",
            );
        }
        "US" | "XA" | "MG" | "DX" | "CR" => {
            require_pixel_module(&mut report, dataset);
        }
        "NM" | "PT" => {
            require_pixel_module(&mut report, dataset);
            expect(
                &mut report,
                dataset,
                tags::ACQUISITION_TIME,
                "AcquisitionTime",
            );
        }
        // structured reports, segmentations and RT objects
        // have no pixel module requirement here
        "SR" | "SEG" | "RTSTRUCT" | "RTPLAN" | "RTDOSE" | "RTIMAGE" => {}
        "" => {}
        other => {
            report.warning(
                tags::MODALITY,
                format!("no dedicated validator for modality {}", other),
            );
        }
    }

    report
}
