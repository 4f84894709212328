//! The persisted instance catalog.
//!
//! Records are kept in memory behind a reader-writer lock,
//! with secondary indexes by study, series and patient.
//! Mutations are journaled to a JSON-lines sidecar file
//! so the catalog survives restarts;
//! it can also be rebuilt from scratch by scanning the storage root.
//!
//! Readers never block each other; a query pass works on a snapshot.

use crate::record::IndexRecord;
use pacs_object::{FileObject, ReadOptions};
use serde::{Deserialize, Serialize};
use snafu::{Backtrace, ResultExt, Snafu};
use std::collections::{BTreeSet, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// A catalog failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not open catalog journal `{}`", path.display()))]
    OpenJournal {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not append to catalog journal"))]
    AppendJournal {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not serialize catalog entry"))]
    SerializeEntry {
        source: serde_json::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("could not scan storage root `{}`", path.display()))]
    ScanStorage {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// One journaled catalog mutation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Put { record: IndexRecord },
    Delete { sop_instance_uid: String },
}

#[derive(Debug, Default)]
struct Inner {
    by_sop: HashMap<String, Arc<IndexRecord>>,
    by_study: HashMap<String, BTreeSet<String>>,
    by_series: HashMap<String, BTreeSet<String>>,
    by_patient: HashMap<String, BTreeSet<String>>,
    /// records whose backing file failed verification
    stale: BTreeSet<String>,
}

impl Inner {
    fn insert(&mut self, record: Arc<IndexRecord>) -> Option<Arc<IndexRecord>> {
        let sop = record.sop_instance_uid.clone();
        self.by_study
            .entry(record.study_instance_uid.clone())
            .or_default()
            .insert(sop.clone());
        self.by_series
            .entry(record.series_instance_uid.clone())
            .or_default()
            .insert(sop.clone());
        self.by_patient
            .entry(record.patient_id.clone())
            .or_default()
            .insert(sop.clone());
        self.by_sop.insert(sop, record)
    }

    fn remove(&mut self, sop_instance_uid: &str) -> Option<Arc<IndexRecord>> {
        let record = self.by_sop.remove(sop_instance_uid)?;
        for (map, key) in [
            (&mut self.by_study, &record.study_instance_uid),
            (&mut self.by_series, &record.series_instance_uid),
            (&mut self.by_patient, &record.patient_id),
        ] {
            if let Some(set) = map.get_mut(key) {
                set.remove(sop_instance_uid);
                if set.is_empty() {
                    map.remove(key);
                }
            }
        }
        self.stale.remove(sop_instance_uid);
        Some(record)
    }
}

/// The instance catalog.
pub struct InstanceIndex {
    inner: RwLock<Inner>,
    journal: Option<Mutex<File>>,
}

impl std::fmt::Debug for InstanceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("InstanceIndex")
            .field("records", &self.len())
            .finish()
    }
}

impl InstanceIndex {
    /// Create an empty, unpersisted catalog.
    pub fn new_in_memory() -> Self {
        InstanceIndex {
            inner: RwLock::new(Inner::default()),
            journal: None,
        }
    }

    /// Open a catalog backed by the given journal file,
    /// replaying any entries already in it.
    ///
    /// A torn trailing line (from a crash mid-append) is dropped
    /// with a warning; anything else malformed is an error surfaced
    /// through the reconciler path, not silently skipped.
    pub fn open(journal_path: impl AsRef<Path>) -> Result<Self> {
        let journal_path = journal_path.as_ref();
        let mut inner = Inner::default();

        if journal_path.exists() {
            let file = File::open(journal_path).context(OpenJournalSnafu {
                path: journal_path,
            })?;
            let reader = BufReader::new(file);
            let mut lines = reader.lines().peekable();
            while let Some(line) = lines.next() {
                let line = line.context(OpenJournalSnafu {
                    path: journal_path,
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<JournalEntry>(&line) {
                    Ok(JournalEntry::Put { record }) => {
                        inner.insert(Arc::new(record));
                    }
                    Ok(JournalEntry::Delete { sop_instance_uid }) => {
                        inner.remove(&sop_instance_uid);
                    }
                    Err(e) if lines.peek().is_none() => {
                        tracing::warn!(error = %e, "dropping torn trailing journal line");
                    }
                    Err(e) => {
                        return Err(e).context(SerializeEntrySnafu);
                    }
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(journal_path)
            .context(OpenJournalSnafu {
                path: journal_path,
            })?;

        Ok(InstanceIndex {
            inner: RwLock::new(inner),
            journal: Some(Mutex::new(file)),
        })
    }

    fn append_journal(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(journal) = &self.journal {
            let mut line = serde_json::to_string(entry).context(SerializeEntrySnafu)?;
            line.push('\n');
            let mut file = journal.lock().expect("journal lock poisoned");
            file.write_all(line.as_bytes()).context(AppendJournalSnafu)?;
            file.flush().context(AppendJournalSnafu)?;
        }
        Ok(())
    }

    /// Insert or replace the record of a SOP instance,
    /// returning the previous record if one existed.
    pub fn upsert(&self, record: IndexRecord) -> Result<Option<Arc<IndexRecord>>> {
        self.append_journal(&JournalEntry::Put {
            record: record.clone(),
        })?;
        let mut inner = self.inner.write().expect("index lock poisoned");
        Ok(inner.insert(Arc::new(record)))
    }

    /// Remove the record of a SOP instance.
    pub fn remove(&self, sop_instance_uid: &str) -> Result<Option<Arc<IndexRecord>>> {
        self.append_journal(&JournalEntry::Delete {
            sop_instance_uid: sop_instance_uid.to_string(),
        })?;
        let mut inner = self.inner.write().expect("index lock poisoned");
        Ok(inner.remove(sop_instance_uid))
    }

    /// Fetch the record of a SOP instance.
    pub fn get(&self, sop_instance_uid: &str) -> Option<Arc<IndexRecord>> {
        let inner = self.inner.read().expect("index lock poisoned");
        inner.by_sop.get(sop_instance_uid).cloned()
    }

    /// The number of records in the catalog.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("index lock poisoned");
        inner.by_sop.len()
    }

    /// Whether the catalog holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A stable snapshot of all records,
    /// ordered by study, series and SOP instance UID.
    pub fn snapshot(&self) -> Vec<Arc<IndexRecord>> {
        let inner = self.inner.read().expect("index lock poisoned");
        let mut records: Vec<Arc<IndexRecord>> = inner.by_sop.values().cloned().collect();
        records.sort_by(|a, b| {
            (
                &a.study_instance_uid,
                &a.series_instance_uid,
                &a.sop_instance_uid,
            )
                .cmp(&(
                    &b.study_instance_uid,
                    &b.series_instance_uid,
                    &b.sop_instance_uid,
                ))
        });
        records
    }

    /// The records of one series, in SOP instance UID order.
    pub fn records_in_series(&self, series_instance_uid: &str) -> Vec<Arc<IndexRecord>> {
        let inner = self.inner.read().expect("index lock poisoned");
        inner
            .by_series
            .get(series_instance_uid)
            .map(|sops| {
                sops.iter()
                    .filter_map(|sop| inner.by_sop.get(sop).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The records of one study, in SOP instance UID order.
    pub fn records_in_study(&self, study_instance_uid: &str) -> Vec<Arc<IndexRecord>> {
        let inner = self.inner.read().expect("index lock poisoned");
        inner
            .by_study
            .get(study_instance_uid)
            .map(|sops| {
                sops.iter()
                    .filter_map(|sop| inner.by_sop.get(sop).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check that the record's file still exists and carries the
    /// same identifying UIDs. On mismatch the record is marked
    /// stale for the background reconciler and `false` is returned.
    pub fn verify(&self, sop_instance_uid: &str) -> bool {
        let record = match self.get(sop_instance_uid) {
            Some(record) => record,
            None => return false,
        };
        let consistent = FileObject::open_file_with(
            &record.file_path,
            ReadOptions {
                allow_missing_preamble: true,
            },
        )
        .map(|file| {
            file.dataset()
                .string_opt(pacs_dictionary_std::tags::SOP_INSTANCE_UID)
                .as_deref()
                == Some(record.sop_instance_uid.as_str())
                && file
                    .dataset()
                    .string_opt(pacs_dictionary_std::tags::STUDY_INSTANCE_UID)
                    .as_deref()
                    == Some(record.study_instance_uid.as_str())
        })
        .unwrap_or(false);

        if !consistent {
            tracing::warn!(
                sop_instance_uid,
                path = %record.file_path.display(),
                "index record does not match its file; marked stale"
            );
            let mut inner = self.inner.write().expect("index lock poisoned");
            inner.stale.insert(sop_instance_uid.to_string());
        }
        consistent
    }

    /// The SOP instance UIDs currently marked stale.
    pub fn stale_records(&self) -> Vec<String> {
        let inner = self.inner.read().expect("index lock poisoned");
        inner.stale.iter().cloned().collect()
    }

    /// Rebuild the catalog by scanning `.dcm` files under the
    /// storage root. Returns the number of records indexed.
    /// Unreadable files are skipped with a warning.
    pub fn rebuild_from_storage(&self, root: impl AsRef<Path>) -> Result<usize> {
        let root = root.as_ref();
        let mut indexed = 0;
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir).context(ScanStorageSnafu { path: &dir })?;
            for entry in entries {
                let entry = entry.context(ScanStorageSnafu { path: &dir })?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().map(|e| e == "dcm") != Some(true) {
                    continue;
                }
                match self.index_file(&path) {
                    Ok(()) => indexed += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file during rebuild");
                    }
                }
            }
        }
        Ok(indexed)
    }

    fn index_file(&self, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let bytes_on_disk = std::fs::metadata(path)?.len();
        let file = FileObject::open_file_with(
            path,
            ReadOptions {
                allow_missing_preamble: true,
            },
        )?;
        let record = IndexRecord::from_dataset(
            file.dataset(),
            &file.meta().transfer_syntax,
            path.to_path_buf(),
            bytes_on_disk,
            chrono::Utc::now(),
        )?;
        self.upsert(record)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InstanceIndex;
    use crate::record::IndexRecord;
    use chrono::Utc;
    use std::path::PathBuf;

    pub(crate) fn sample_record(sop: &str, series: &str, study: &str, patient: &str) -> IndexRecord {
        IndexRecord {
            sop_instance_uid: sop.to_string(),
            sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
            series_instance_uid: series.to_string(),
            study_instance_uid: study.to_string(),
            patient_id: patient.to_string(),
            patient_name: "DOE^JOHN".to_string(),
            modality: "CT".to_string(),
            study_date: Some("20240115".to_string()),
            series_number: Some(1),
            instance_number: Some(1),
            slice_location: None,
            image_position_patient: None,
            acquisition_time: None,
            transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
            file_path: PathBuf::from(format!("/data/{}.dcm", sop.replace('.', "_"))),
            bytes_on_disk: 1024,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_and_lookup() {
        let index = InstanceIndex::new_in_memory();
        index
            .upsert(sample_record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123"))
            .unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("1.2.3.4.5").is_some());
        assert_eq!(index.records_in_series("1.2.3.1").len(), 1);
        assert_eq!(index.records_in_study("1.2.3").len(), 1);
    }

    #[test]
    fn upsert_replaces_by_sop_uid() {
        let index = InstanceIndex::new_in_memory();
        index
            .upsert(sample_record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123"))
            .unwrap();
        let previous = index
            .upsert(sample_record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123"))
            .unwrap();
        assert!(previous.is_some());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_cleans_secondary_indexes() {
        let index = InstanceIndex::new_in_memory();
        index
            .upsert(sample_record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123"))
            .unwrap();
        index.remove("1.2.3.4.5").unwrap();
        assert!(index.is_empty());
        assert!(index.records_in_series("1.2.3.1").is_empty());
    }

    #[test]
    fn journal_replay_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("index.jsonl");
        {
            let index = InstanceIndex::open(&journal).unwrap();
            index
                .upsert(sample_record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123"))
                .unwrap();
            index
                .upsert(sample_record("1.2.3.4.6", "1.2.3.1", "1.2.3", "123"))
                .unwrap();
            index.remove("1.2.3.4.6").unwrap();
        }
        let reopened = InstanceIndex::open(&journal).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.get("1.2.3.4.5").is_some());
        assert!(reopened.get("1.2.3.4.6").is_none());
    }

    #[test]
    fn snapshot_order_is_stable() {
        let index = InstanceIndex::new_in_memory();
        index
            .upsert(sample_record("1.2.9.1", "1.2.9.0", "1.2.9", "456"))
            .unwrap();
        index
            .upsert(sample_record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123"))
            .unwrap();
        let first: Vec<String> = index
            .snapshot()
            .iter()
            .map(|r| r.sop_instance_uid.clone())
            .collect();
        let second: Vec<String> = index
            .snapshot()
            .iter()
            .map(|r| r.sop_instance_uid.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "1.2.3.4.5");
    }
}
