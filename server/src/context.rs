//! The shared state of a running service class provider.

use crate::config::ScpConfig;
use crate::ingest::StorageEvent;
use crate::mpps::MppsStore;
use pacs_dimse::Status;
use pacs_index::worklist::WorklistStore;
use pacs_index::InstanceIndex;
use pacs_metrics::PacsMetrics;
use snafu::{ResultExt, Snafu};
use std::sync::{mpsc, Arc, Mutex};

/// A context construction failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not open the instance index"))]
    OpenIndex {
        #[snafu(backtrace)]
        source: pacs_index::catalog::Error,
    },
}

/// Everything the service handlers share:
/// configuration, catalog, worklist, MPPS records, metrics
/// and the storage event channel.
///
/// Constructed once and shared behind an `Arc` across the
/// per-association worker threads.
pub struct ServerContext {
    pub config: ScpConfig,
    pub index: InstanceIndex,
    pub worklist: WorklistStore,
    pub mpps: MppsStore,
    pub metrics: Arc<PacsMetrics>,
    events: Mutex<mpsc::Sender<StorageEvent>>,
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("ae_title", &self.config.ae_title)
            .field("indexed", &self.index.len())
            .finish()
    }
}

impl ServerContext {
    /// Build a context with a journaled index.
    ///
    /// The journal lives at the configured path, or as
    /// `index.jsonl` next to the storage root by default.
    pub fn new(config: ScpConfig) -> Result<(Self, mpsc::Receiver<StorageEvent>), Error> {
        let journal = config
            .index_journal
            .clone()
            .unwrap_or_else(|| config.storage_root.join("index.jsonl"));
        if let Some(parent) = journal.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let index = InstanceIndex::open(journal).context(OpenIndexSnafu)?;
        Ok(Self::with_index(config, index))
    }

    /// Build a context whose index lives only in memory
    /// (tests, ephemeral deployments).
    pub fn new_in_memory(
        config: ScpConfig,
    ) -> Result<(Self, mpsc::Receiver<StorageEvent>), Error> {
        Ok(Self::with_index(config, InstanceIndex::new_in_memory()))
    }

    fn with_index(
        config: ScpConfig,
        index: InstanceIndex,
    ) -> (Self, mpsc::Receiver<StorageEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            ServerContext {
                config,
                index,
                worklist: WorklistStore::new(),
                mpps: MppsStore::new(),
                metrics: Arc::new(PacsMetrics::new()),
                events: Mutex::new(sender),
            },
            receiver,
        )
    }

    /// Emit a storage event. A gone consumer is tolerated.
    pub(crate) fn notify(&self, event: StorageEvent) {
        let sender = self.events.lock().expect("event channel lock poisoned");
        if sender.send(event).is_err() {
            tracing::debug!("storage event dropped: consumer is gone");
        }
    }

    pub(crate) fn notify_failure(
        &self,
        sop_instance_uid: &str,
        calling_ae_title: &str,
        status: Status,
        reason: &str,
    ) {
        self.notify(StorageEvent::InstanceFailed {
            sop_instance_uid: sop_instance_uid.to_string(),
            calling_ae_title: calling_ae_title.to_string(),
            status: status.0,
            reason: reason.to_string(),
        });
    }
}
