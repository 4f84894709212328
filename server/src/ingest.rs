//! The storage ingestion pipeline:
//! validate, place, write atomically, index, notify.

use crate::config::{DuplicatePolicy, ScpConfig, ValidationGate};
use crate::context::ServerContext;
use crate::validation;
use chrono::Utc;
use pacs_dimse::Status;
use pacs_dictionary_std::tags;
use pacs_object::{sanitized_filename, FileMetaTableBuilder, FileObject, InMemObject};
use std::path::PathBuf;

/// A typed event emitted by the ingestion path.
///
/// Consumers read these from the channel handed out at server
/// construction; there are no detached callback threads,
/// so shutdown drains deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    /// An instance was stored and indexed.
    InstanceStored {
        sop_instance_uid: String,
        sop_class_uid: String,
        study_instance_uid: String,
        series_instance_uid: String,
        calling_ae_title: String,
        file_path: PathBuf,
        bytes_on_disk: u64,
    },
    /// An instance was refused or failed to persist.
    InstanceFailed {
        sop_instance_uid: String,
        calling_ae_title: String,
        status: u16,
        reason: String,
    },
}

/// Sanitize one path component derived from DICOM attributes.
fn sanitized_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .trim_end_matches('\0')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "UNKNOWN".to_string()
    } else {
        cleaned
    }
}

fn target_path(config: &ScpConfig, dataset: &InMemObject, sop_instance_uid: &str) -> PathBuf {
    let file_name = sanitized_filename(sop_instance_uid);
    if config.organize_folders {
        let patient = sanitized_component(
            &dataset.string_opt(tags::PATIENT_ID).unwrap_or_default(),
        );
        let study = sanitized_component(
            &dataset
                .string_opt(tags::STUDY_INSTANCE_UID)
                .unwrap_or_default(),
        );
        let series = sanitized_component(
            &dataset
                .string_opt(tags::SERIES_INSTANCE_UID)
                .unwrap_or_default(),
        );
        config
            .storage_root
            .join(patient)
            .join(study)
            .join(series)
            .join(file_name)
    } else {
        config.storage_root.join(file_name)
    }
}

/// A numbered sibling path for the keep-both duplicate policy.
fn renamed_path(path: &PathBuf) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("instance");
    let mut counter = 1;
    loop {
        let candidate = path.with_file_name(format!("{}-{}.dcm", stem, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Write the object atomically: a temporary sibling is written
/// and fsynced, then renamed over the target.
fn write_atomic(file: &FileObject, path: &PathBuf) -> std::io::Result<u64> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("dcm.tmp");
    let result = (|| {
        let mut buffer = Vec::new();
        file.write_all(&mut buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        let bytes = buffer.len() as u64;
        {
            let mut tmp = std::fs::File::create(&tmp_path)?;
            use std::io::Write;
            tmp.write_all(&buffer)?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(bytes)
    })();
    if result.is_err() {
        // never leave a partial temp file behind
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

/// The outcome of one ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub status: Status,
    /// a human message for failure statuses; never carries PHI
    pub message: Option<String>,
}

impl IngestOutcome {
    fn success() -> Self {
        IngestOutcome {
            status: Status::SUCCESS,
            message: None,
        }
    }

    fn refused(status: Status, message: impl Into<String>) -> Self {
        IngestOutcome {
            status,
            message: Some(message.into()),
        }
    }
}

/// Run the ingestion pipeline on one received dataset.
pub fn ingest(
    context: &ServerContext,
    dataset: InMemObject,
    transfer_syntax: &str,
    calling_ae_title: &str,
) -> IngestOutcome {
    let sop_instance_uid = match dataset.string_opt(tags::SOP_INSTANCE_UID) {
        Some(uid) => uid,
        None => {
            return IngestOutcome::refused(
                Status::CANNOT_UNDERSTAND,
                "dataset carries no SOP instance UID",
            );
        }
    };

    let report = validation::validate(&dataset);
    let blocked = match context.config.validation_gate {
        ValidationGate::Error => report.has_errors(),
        ValidationGate::Warning => report.has_warnings(),
    };
    if blocked {
        let reason = report
            .issues
            .first()
            .map(|issue| issue.to_string())
            .unwrap_or_else(|| "validation failed".to_string());
        context.notify_failure(&sop_instance_uid, calling_ae_title, Status::DATASET_DOES_NOT_MATCH_SOP_CLASS, &reason);
        return IngestOutcome::refused(Status::DATASET_DOES_NOT_MATCH_SOP_CLASS, reason);
    }

    let mut path = target_path(&context.config, &dataset, &sop_instance_uid);
    if context.index.get(&sop_instance_uid).is_some() {
        match context.config.duplicate_policy {
            DuplicatePolicy::Reject => {
                let reason = format!("SOP instance {} already stored", sop_instance_uid);
                context.notify_failure(
                    &sop_instance_uid,
                    calling_ae_title,
                    Status::DUPLICATE_SOP_INSTANCE,
                    &reason,
                );
                return IngestOutcome::refused(Status::DUPLICATE_SOP_INSTANCE, reason);
            }
            DuplicatePolicy::Overwrite => {}
            DuplicatePolicy::KeepBothRename => {
                path = renamed_path(&path);
            }
        }
    }

    let sop_class_uid = dataset.string_opt(tags::SOP_CLASS_UID).unwrap_or_default();
    let meta = match FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(sop_class_uid.clone())
        .media_storage_sop_instance_uid(sop_instance_uid.clone())
        .transfer_syntax(transfer_syntax)
        .source_application_entity_title(calling_ae_title)
        .build()
    {
        Ok(meta) => meta,
        Err(e) => {
            return IngestOutcome::refused(Status::CANNOT_UNDERSTAND, e.to_string());
        }
    };

    let file = FileObject::new(meta, dataset);
    let bytes_on_disk = match write_atomic(&file, &path) {
        Ok(bytes) => bytes,
        Err(e) => {
            let reason = format!("could not persist object: {}", e);
            tracing::error!(%sop_instance_uid, error = %e, "storage write failed");
            context.notify_failure(
                &sop_instance_uid,
                calling_ae_title,
                Status::OUT_OF_RESOURCES,
                &reason,
            );
            return IngestOutcome::refused(Status::OUT_OF_RESOURCES, reason);
        }
    };

    let record = match pacs_index::IndexRecord::from_dataset(
        file.dataset(),
        transfer_syntax,
        path.clone(),
        bytes_on_disk,
        Utc::now(),
    ) {
        Ok(record) => record,
        Err(e) => {
            let _ = std::fs::remove_file(&path);
            return IngestOutcome::refused(Status::CANNOT_UNDERSTAND, e.to_string());
        }
    };

    let study_instance_uid = record.study_instance_uid.clone();
    let series_instance_uid = record.series_instance_uid.clone();
    if let Err(e) = context.index.upsert(record) {
        let reason = format!("could not index object: {}", e);
        tracing::error!(%sop_instance_uid, error = %e, "index write failed");
        context.notify_failure(
            &sop_instance_uid,
            calling_ae_title,
            Status::OUT_OF_RESOURCES,
            &reason,
        );
        return IngestOutcome::refused(Status::OUT_OF_RESOURCES, reason);
    }

    context.notify(StorageEvent::InstanceStored {
        sop_instance_uid,
        sop_class_uid,
        study_instance_uid,
        series_instance_uid,
        calling_ae_title: calling_ae_title.to_string(),
        file_path: path,
        bytes_on_disk,
    });
    context.metrics.transfer.increment_images_stored();
    context.metrics.transfer.add_bytes_received(bytes_on_disk);

    IngestOutcome::success()
}

#[cfg(test)]
mod tests {
    use super::{ingest, StorageEvent};
    use crate::config::{DuplicatePolicy, ScpConfig};
    use crate::context::ServerContext;
    use pacs_core::{PrimitiveValue, VR};
    use pacs_dimse::Status;
    use pacs_dictionary_std::tags;
    use pacs_object::{DataElement, InMemObject};
    use std::sync::mpsc;

    fn minimal_ct() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put_str(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.2");
        obj.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4.5");
        obj.put_str(tags::STUDY_INSTANCE_UID, VR::UI, "1.2.3");
        obj.put_str(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.1");
        obj.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        obj.put_str(tags::PATIENT_ID, VR::LO, "123");
        obj.put_str(tags::MODALITY, VR::CS, "CT");
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(2_u16)));
        obj.put(DataElement::new(
            tags::BITS_ALLOCATED,
            VR::US,
            PrimitiveValue::from(8_u16),
        ));
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::from(vec![0u8, 128, 64, 255]),
        ));
        obj
    }

    fn test_context(root: &std::path::Path) -> (ServerContext, mpsc::Receiver<StorageEvent>) {
        let mut config = ScpConfig::default();
        config.storage_root = root.to_path_buf();
        ServerContext::new_in_memory(config).unwrap()
    }

    #[test]
    fn stores_under_organized_folders() {
        let dir = tempfile::tempdir().unwrap();
        let (context, events) = test_context(dir.path());

        let outcome = ingest(&context, minimal_ct(), "1.2.840.10008.1.2.1", "STORE-SCU");
        assert_eq!(outcome.status, Status::SUCCESS);

        let expected = dir
            .path()
            .join("123")
            .join("1.2.3")
            .join("1.2.3.1")
            .join("1_2_3_4_5.dcm");
        assert!(expected.exists(), "missing {}", expected.display());
        assert!(context.index.get("1.2.3.4.5").is_some());

        match events.try_recv().unwrap() {
            StorageEvent::InstanceStored {
                sop_instance_uid, ..
            } => assert_eq!(sop_instance_uid, "1.2.3.4.5"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn invalid_object_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let (context, _events) = test_context(dir.path());
        let mut object = minimal_ct();
        object.remove(tags::PIXEL_DATA);
        let outcome = ingest(&context, object, "1.2.840.10008.1.2.1", "STORE-SCU");
        assert_eq!(outcome.status, Status::DATASET_DOES_NOT_MATCH_SOP_CLASS);
        assert!(context.index.is_empty());
    }

    #[test]
    fn duplicate_policies() {
        let dir = tempfile::tempdir().unwrap();
        let (mut context, _events) = test_context(dir.path());

        assert_eq!(
            ingest(&context, minimal_ct(), "1.2.840.10008.1.2.1", "SCU").status,
            Status::SUCCESS
        );
        // default policy replaces
        assert_eq!(
            ingest(&context, minimal_ct(), "1.2.840.10008.1.2.1", "SCU").status,
            Status::SUCCESS
        );
        assert_eq!(context.index.len(), 1);

        context.config.duplicate_policy = DuplicatePolicy::Reject;
        assert_eq!(
            ingest(&context, minimal_ct(), "1.2.840.10008.1.2.1", "SCU").status,
            Status::DUPLICATE_SOP_INSTANCE
        );

        context.config.duplicate_policy = DuplicatePolicy::KeepBothRename;
        assert_eq!(
            ingest(&context, minimal_ct(), "1.2.840.10008.1.2.1", "SCU").status,
            Status::SUCCESS
        );
        let series_dir = dir.path().join("123").join("1.2.3").join("1.2.3.1");
        let count = std::fs::read_dir(series_dir).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn missing_sop_instance_uid_cannot_be_understood() {
        let dir = tempfile::tempdir().unwrap();
        let (context, _events) = test_context(dir.path());
        let mut object = minimal_ct();
        object.remove(tags::SOP_INSTANCE_UID);
        let outcome = ingest(&context, object, "1.2.840.10008.1.2.1", "SCU");
        assert_eq!(outcome.status, Status::CANNOT_UNDERSTAND);
    }
}
