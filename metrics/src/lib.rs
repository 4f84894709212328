//! Operation metrics for the PACS suite.
//!
//! Every update is a single atomic instruction (fetch-add,
//! or a compare-and-swap loop for minima, maxima and peaks),
//! so the hooks can sit on every hot path.
//!
//! There is no global instance: the embedding application constructs
//! a [`PacsMetrics`] and shares it behind an `Arc`.
//! Exports are available as JSON and as Prometheus text
//! with stable names under the `pacs_` prefix.

mod export;

pub use export::prometheus_text;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// The DIMSE operations tracked individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimseOperation {
    CEcho,
    CStore,
    CFind,
    CMove,
    CGet,
    NCreate,
    NSet,
}

impl DimseOperation {
    /// The metric name component of this operation.
    pub fn name(self) -> &'static str {
        match self {
            DimseOperation::CEcho => "c_echo",
            DimseOperation::CStore => "c_store",
            DimseOperation::CFind => "c_find",
            DimseOperation::CMove => "c_move",
            DimseOperation::CGet => "c_get",
            DimseOperation::NCreate => "n_create",
            DimseOperation::NSet => "n_set",
        }
    }

    /// All tracked operations, in export order.
    pub fn all() -> &'static [DimseOperation] {
        &[
            DimseOperation::CEcho,
            DimseOperation::CStore,
            DimseOperation::CFind,
            DimseOperation::CMove,
            DimseOperation::CGet,
            DimseOperation::NCreate,
            DimseOperation::NSet,
        ]
    }
}

/// Success/failure counts and duration aggregates of one operation.
#[derive(Debug, Default)]
pub struct OperationCounter {
    success_count: AtomicU64,
    failure_count: AtomicU64,
    total_duration_us: AtomicU64,
    min_duration_us: AtomicU64,
    max_duration_us: AtomicU64,
}

impl OperationCounter {
    /// Record one completed operation.
    pub fn record(&self, success: bool, duration: Duration) {
        let duration_us = duration.as_micros() as u64;
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_duration_us
            .fetch_add(duration_us, Ordering::Relaxed);
        update_min(&self.min_duration_us, duration_us);
        update_max(&self.max_duration_us, duration_us);
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Total number of operations, successes plus failures.
    pub fn total_count(&self) -> u64 {
        self.success_count() + self.failure_count()
    }

    pub fn total_duration_us(&self) -> u64 {
        self.total_duration_us.load(Ordering::Relaxed)
    }

    /// The shortest recorded duration, or zero when nothing
    /// has been recorded yet.
    pub fn min_duration_us(&self) -> u64 {
        let min = self.min_duration_us.load(Ordering::Relaxed);
        if self.total_count() == 0 && min == 0 {
            0
        } else if min == u64::MAX {
            0
        } else {
            min
        }
    }

    pub fn max_duration_us(&self) -> u64 {
        self.max_duration_us.load(Ordering::Relaxed)
    }

    /// The mean duration in microseconds.
    pub fn average_duration_us(&self) -> u64 {
        let total = self.total_count();
        if total == 0 {
            0
        } else {
            self.total_duration_us() / total
        }
    }

    fn reset(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.total_duration_us.store(0, Ordering::Relaxed);
        self.min_duration_us.store(u64::MAX, Ordering::Relaxed);
        self.max_duration_us.store(0, Ordering::Relaxed);
    }
}

fn update_min(slot: &AtomicU64, value: u64) {
    let mut current = slot.load(Ordering::Relaxed);
    // zero marks the unset state right after construction
    if current == 0 {
        match slot.compare_exchange_weak(0, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
    while value < current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn update_max(slot: &AtomicU64, value: u64) {
    let mut current = slot.load(Ordering::Relaxed);
    while value > current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

fn update_peak(slot: &AtomicU32, value: u32) {
    let mut current = slot.load(Ordering::Relaxed);
    while value > current {
        match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Bytes and object counts moved over the network.
#[derive(Debug, Default)]
pub struct DataTransferMetrics {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    images_stored: AtomicU64,
    images_retrieved: AtomicU64,
}

impl DataTransferMetrics {
    pub fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_images_stored(&self) {
        self.images_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_images_retrieved(&self) {
        self.images_retrieved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn images_stored(&self) -> u64 {
        self.images_stored.load(Ordering::Relaxed)
    }

    pub fn images_retrieved(&self) -> u64 {
        self.images_retrieved.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.images_stored.store(0, Ordering::Relaxed);
        self.images_retrieved.store(0, Ordering::Relaxed);
    }
}

/// Association lifecycle counters and gauges.
#[derive(Debug, Default)]
pub struct AssociationCounters {
    total_established: AtomicU64,
    total_rejected: AtomicU64,
    total_aborted: AtomicU64,
    current_active: AtomicU32,
    peak_active: AtomicU32,
}

impl AssociationCounters {
    pub fn record_established(&self) {
        self.total_established.fetch_add(1, Ordering::Relaxed);
        let active = self.current_active.fetch_add(1, Ordering::Relaxed) + 1;
        update_peak(&self.peak_active, active);
    }

    pub fn record_released(&self) {
        // saturate rather than wrap if release outpaces establish
        let _ = self
            .current_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                v.checked_sub(1)
            });
    }

    pub fn record_rejected(&self) {
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aborted(&self) {
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
        self.record_released();
    }

    pub fn total_established(&self) -> u64 {
        self.total_established.load(Ordering::Relaxed)
    }

    pub fn total_rejected(&self) -> u64 {
        self.total_rejected.load(Ordering::Relaxed)
    }

    pub fn total_aborted(&self) -> u64 {
        self.total_aborted.load(Ordering::Relaxed)
    }

    pub fn current_active(&self) -> u32 {
        self.current_active.load(Ordering::Relaxed)
    }

    pub fn peak_active(&self) -> u32 {
        self.peak_active.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.total_established.store(0, Ordering::Relaxed);
        self.total_rejected.store(0, Ordering::Relaxed);
        self.total_aborted.store(0, Ordering::Relaxed);
        self.current_active.store(0, Ordering::Relaxed);
        self.peak_active.store(0, Ordering::Relaxed);
    }
}

/// Object pool counters, fed by any pooled resource.
#[derive(Debug, Default)]
pub struct PoolCounters {
    acquisitions: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PoolCounters {
    pub fn record_acquisition(&self, hit: bool) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// The fraction of acquisitions served from the pool.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.acquisitions();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    fn reset(&self) {
        self.acquisitions.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// The process-wide metrics aggregate.
#[derive(Debug, Default)]
pub struct PacsMetrics {
    c_echo: OperationCounter,
    c_store: OperationCounter,
    c_find: OperationCounter,
    c_move: OperationCounter,
    c_get: OperationCounter,
    n_create: OperationCounter,
    n_set: OperationCounter,
    /// network transfer totals
    pub transfer: DataTransferMetrics,
    /// association lifecycle counters
    pub associations: AssociationCounters,
    /// object pool counters
    pub pools: PoolCounters,
}

impl PacsMetrics {
    /// Create a metrics aggregate with all counters at zero.
    pub fn new() -> Self {
        PacsMetrics::default()
    }

    /// The counter of the given operation.
    pub fn operation(&self, op: DimseOperation) -> &OperationCounter {
        match op {
            DimseOperation::CEcho => &self.c_echo,
            DimseOperation::CStore => &self.c_store,
            DimseOperation::CFind => &self.c_find,
            DimseOperation::CMove => &self.c_move,
            DimseOperation::CGet => &self.c_get,
            DimseOperation::NCreate => &self.n_create,
            DimseOperation::NSet => &self.n_set,
        }
    }

    /// Record one completed DIMSE operation.
    pub fn record_operation(&self, op: DimseOperation, success: bool, duration: Duration) {
        self.operation(op).record(success, duration);
    }

    /// Render the metrics as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        export::json_value(self)
    }

    /// Render the metrics in Prometheus text exposition format,
    /// with names prefixed `pacs_`.
    pub fn to_prometheus(&self) -> String {
        export::prometheus_text(self)
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        for &op in DimseOperation::all() {
            self.operation(op).reset();
        }
        self.transfer.reset();
        self.associations.reset();
        self.pools.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::{DimseOperation, PacsMetrics};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn totals_are_success_plus_failure() {
        let metrics = PacsMetrics::new();
        metrics.record_operation(DimseOperation::CStore, true, Duration::from_micros(120));
        metrics.record_operation(DimseOperation::CStore, true, Duration::from_micros(80));
        metrics.record_operation(DimseOperation::CStore, false, Duration::from_micros(500));

        let counter = metrics.operation(DimseOperation::CStore);
        assert_eq!(counter.total_count(), 3);
        assert_eq!(counter.success_count() + counter.failure_count(), 3);
        assert_eq!(counter.min_duration_us(), 80);
        assert_eq!(counter.max_duration_us(), 500);
        assert_eq!(counter.total_duration_us(), 700);
    }

    #[test]
    fn association_gauges_hold_their_bound() {
        let metrics = PacsMetrics::new();
        metrics.associations.record_established();
        metrics.associations.record_established();
        metrics.associations.record_released();
        metrics.associations.record_established();

        let assoc = &metrics.associations;
        assert!(assoc.current_active() <= assoc.peak_active());
        assert!(u64::from(assoc.peak_active()) <= assoc.total_established());
        assert_eq!(assoc.current_active(), 2);
        assert_eq!(assoc.peak_active(), 2);
        assert_eq!(assoc.total_established(), 3);

        // releasing more than established saturates at zero
        assoc.record_released();
        assoc.record_released();
        assoc.record_released();
        assert_eq!(assoc.current_active(), 0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let metrics = Arc::new(PacsMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    metrics.record_operation(
                        DimseOperation::CEcho,
                        true,
                        Duration::from_micros(10),
                    );
                    metrics.transfer.add_bytes_received(4);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.operation(DimseOperation::CEcho).total_count(), 8000);
        assert_eq!(metrics.transfer.bytes_received(), 32000);
    }

    #[test]
    fn pool_hit_ratio() {
        let metrics = PacsMetrics::new();
        metrics.pools.record_acquisition(true);
        metrics.pools.record_acquisition(true);
        metrics.pools.record_acquisition(false);
        assert!((metrics.pools.hit_ratio() - 2.0 / 3.0).abs() < 1e-9);
    }
}
