//! Modality performed procedure step records (N-CREATE/N-SET).

use pacs_dictionary_std::tags;
use pacs_object::InMemObject;
use snafu::{Backtrace, Snafu};
use std::collections::HashMap;
use std::sync::RwLock;

/// An MPPS handling failure, mapped to a DIMSE status
/// by the service handler.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// N-CREATE for a SOP instance that already exists.
    #[snafu(display("performed procedure step {} already exists", sop_instance_uid))]
    AlreadyExists {
        sop_instance_uid: String,
        backtrace: Backtrace,
    },
    /// N-SET for a SOP instance never created.
    #[snafu(display("no performed procedure step {}", sop_instance_uid))]
    NoSuchStep {
        sop_instance_uid: String,
        backtrace: Backtrace,
    },
    /// N-SET on a step already out of IN PROGRESS.
    #[snafu(display(
        "performed procedure step {} is already {}",
        sop_instance_uid,
        status
    ))]
    StepClosed {
        sop_instance_uid: String,
        status: String,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The store of performed procedure steps,
/// keyed by affected SOP instance UID.
#[derive(Debug, Default)]
pub struct MppsStore {
    records: RwLock<HashMap<String, InMemObject>>,
}

impl MppsStore {
    pub fn new() -> Self {
        MppsStore::default()
    }

    /// Handle an N-CREATE: persist the new step.
    pub fn create(&self, sop_instance_uid: &str, dataset: InMemObject) -> Result<()> {
        let mut records = self.records.write().expect("mpps lock poisoned");
        if records.contains_key(sop_instance_uid) {
            return AlreadyExistsSnafu { sop_instance_uid }.fail();
        }
        records.insert(sop_instance_uid.to_string(), dataset);
        Ok(())
    }

    /// Handle an N-SET: merge the changes into the stored step.
    ///
    /// A step whose status already left IN PROGRESS is closed
    /// and refuses further sets.
    pub fn update(&self, sop_instance_uid: &str, changes: InMemObject) -> Result<()> {
        let mut records = self.records.write().expect("mpps lock poisoned");
        let record = match records.get_mut(sop_instance_uid) {
            Some(record) => record,
            None => return NoSuchStepSnafu { sop_instance_uid }.fail(),
        };
        let status = record
            .string_opt(tags::PERFORMED_PROCEDURE_STEP_STATUS)
            .unwrap_or_default();
        if !status.is_empty() && status != "IN PROGRESS" {
            return StepClosedSnafu {
                sop_instance_uid,
                status,
            }
            .fail();
        }
        for element in changes.into_iter() {
            record.put(element);
        }
        Ok(())
    }

    /// Fetch a copy of one step.
    pub fn get(&self, sop_instance_uid: &str) -> Option<InMemObject> {
        let records = self.records.read().expect("mpps lock poisoned");
        records.get(sop_instance_uid).cloned()
    }

    /// The number of stored steps.
    pub fn len(&self) -> usize {
        self.records.read().expect("mpps lock poisoned").len()
    }

    /// Whether no step is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, MppsStore};
    use pacs_core::VR;
    use pacs_dictionary_std::tags;
    use pacs_object::InMemObject;

    fn in_progress() -> InMemObject {
        let mut obj = InMemObject::new_empty();
        obj.put_str(tags::PERFORMED_PROCEDURE_STEP_STATUS, VR::CS, "IN PROGRESS");
        obj.put_str(tags::PERFORMED_PROCEDURE_STEP_ID, VR::SH, "PPS1");
        obj
    }

    #[test]
    fn create_then_complete() {
        let store = MppsStore::new();
        store.create("1.2.3.9", in_progress()).unwrap();

        let mut completion = InMemObject::new_empty();
        completion.put_str(tags::PERFORMED_PROCEDURE_STEP_STATUS, VR::CS, "COMPLETED");
        completion.put_str(tags::PERFORMED_PROCEDURE_STEP_END_DATE, VR::DA, "20240115");
        store.update("1.2.3.9", completion).unwrap();

        let record = store.get("1.2.3.9").unwrap();
        assert_eq!(
            record
                .string(tags::PERFORMED_PROCEDURE_STEP_STATUS)
                .unwrap(),
            "COMPLETED"
        );
        // original attributes survive the merge
        assert_eq!(
            record.string(tags::PERFORMED_PROCEDURE_STEP_ID).unwrap(),
            "PPS1"
        );
    }

    #[test]
    fn duplicate_create_is_refused() {
        let store = MppsStore::new();
        store.create("1.2.3.9", in_progress()).unwrap();
        assert!(matches!(
            store.create("1.2.3.9", in_progress()),
            Err(Error::AlreadyExists { .. })
        ));
    }

    #[test]
    fn set_on_unknown_step_is_refused() {
        let store = MppsStore::new();
        assert!(matches!(
            store.update("9.9.9", InMemObject::new_empty()),
            Err(Error::NoSuchStep { .. })
        ));
    }

    #[test]
    fn completed_step_is_closed() {
        let store = MppsStore::new();
        store.create("1.2.3.9", in_progress()).unwrap();
        let mut completion = InMemObject::new_empty();
        completion.put_str(tags::PERFORMED_PROCEDURE_STEP_STATUS, VR::CS, "COMPLETED");
        store.update("1.2.3.9", completion).unwrap();

        let mut more = InMemObject::new_empty();
        more.put_str(tags::PERFORMED_PROCEDURE_STEP_STATUS, VR::CS, "DISCONTINUED");
        assert!(matches!(
            store.update("1.2.3.9", more),
            Err(Error::StepClosed { .. })
        ));
    }
}
