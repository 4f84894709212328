//! Metric export formats: JSON and Prometheus text.

use crate::{DimseOperation, PacsMetrics};
use serde_json::json;
use std::fmt::Write as _;

/// Render the metrics as a JSON value.
pub(crate) fn json_value(metrics: &PacsMetrics) -> serde_json::Value {
    let mut operations = serde_json::Map::new();
    for &op in DimseOperation::all() {
        let counter = metrics.operation(op);
        operations.insert(
            op.name().to_string(),
            json!({
                "total": counter.total_count(),
                "success": counter.success_count(),
                "failure": counter.failure_count(),
                "duration_us": {
                    "sum": counter.total_duration_us(),
                    "min": counter.min_duration_us(),
                    "max": counter.max_duration_us(),
                    "avg": counter.average_duration_us(),
                },
            }),
        );
    }

    json!({
        "operations": operations,
        "transfer": {
            "bytes_sent": metrics.transfer.bytes_sent(),
            "bytes_received": metrics.transfer.bytes_received(),
            "images_stored": metrics.transfer.images_stored(),
            "images_retrieved": metrics.transfer.images_retrieved(),
        },
        "associations": {
            "total_established": metrics.associations.total_established(),
            "total_rejected": metrics.associations.total_rejected(),
            "total_aborted": metrics.associations.total_aborted(),
            "current_active": metrics.associations.current_active(),
            "peak_active": metrics.associations.peak_active(),
        },
        "pools": {
            "acquisitions": metrics.pools.acquisitions(),
            "hits": metrics.pools.hits(),
            "misses": metrics.pools.misses(),
            "hit_ratio": metrics.pools.hit_ratio(),
        },
    })
}

/// Render the metrics in Prometheus text exposition format.
///
/// Metric names are stable; collectors may scrape this output
/// periodically.
pub fn prometheus_text(metrics: &PacsMetrics) -> String {
    let mut out = String::with_capacity(2048);

    out.push_str("# TYPE pacs_operations_total counter\n");
    for &op in DimseOperation::all() {
        let counter = metrics.operation(op);
        let _ = writeln!(
            out,
            "pacs_operations_total{{operation=\"{}\",outcome=\"success\"}} {}",
            op.name(),
            counter.success_count()
        );
        let _ = writeln!(
            out,
            "pacs_operations_total{{operation=\"{}\",outcome=\"failure\"}} {}",
            op.name(),
            counter.failure_count()
        );
    }

    out.push_str("# TYPE pacs_operation_duration_microseconds_sum counter\n");
    for &op in DimseOperation::all() {
        let counter = metrics.operation(op);
        let _ = writeln!(
            out,
            "pacs_operation_duration_microseconds_sum{{operation=\"{}\"}} {}",
            op.name(),
            counter.total_duration_us()
        );
    }

    out.push_str("# TYPE pacs_bytes_sent_total counter\n");
    let _ = writeln!(out, "pacs_bytes_sent_total {}", metrics.transfer.bytes_sent());
    out.push_str("# TYPE pacs_bytes_received_total counter\n");
    let _ = writeln!(
        out,
        "pacs_bytes_received_total {}",
        metrics.transfer.bytes_received()
    );
    out.push_str("# TYPE pacs_images_stored_total counter\n");
    let _ = writeln!(
        out,
        "pacs_images_stored_total {}",
        metrics.transfer.images_stored()
    );
    out.push_str("# TYPE pacs_images_retrieved_total counter\n");
    let _ = writeln!(
        out,
        "pacs_images_retrieved_total {}",
        metrics.transfer.images_retrieved()
    );

    out.push_str("# TYPE pacs_associations_established_total counter\n");
    let _ = writeln!(
        out,
        "pacs_associations_established_total {}",
        metrics.associations.total_established()
    );
    out.push_str("# TYPE pacs_associations_rejected_total counter\n");
    let _ = writeln!(
        out,
        "pacs_associations_rejected_total {}",
        metrics.associations.total_rejected()
    );
    out.push_str("# TYPE pacs_associations_aborted_total counter\n");
    let _ = writeln!(
        out,
        "pacs_associations_aborted_total {}",
        metrics.associations.total_aborted()
    );
    out.push_str("# TYPE pacs_associations_active gauge\n");
    let _ = writeln!(
        out,
        "pacs_associations_active {}",
        metrics.associations.current_active()
    );
    out.push_str("# TYPE pacs_associations_active_peak gauge\n");
    let _ = writeln!(
        out,
        "pacs_associations_active_peak {}",
        metrics.associations.peak_active()
    );

    out.push_str("# TYPE pacs_pool_acquisitions_total counter\n");
    let _ = writeln!(
        out,
        "pacs_pool_acquisitions_total {}",
        metrics.pools.acquisitions()
    );
    out.push_str("# TYPE pacs_pool_hit_ratio gauge\n");
    let _ = writeln!(out, "pacs_pool_hit_ratio {}", metrics.pools.hit_ratio());

    out
}

#[cfg(test)]
mod tests {
    use crate::{DimseOperation, PacsMetrics};
    use std::time::Duration;

    #[test]
    fn json_shape() {
        let metrics = PacsMetrics::new();
        metrics.record_operation(DimseOperation::CEcho, true, Duration::from_micros(42));
        metrics.transfer.add_bytes_received(1024);

        let value = metrics.to_json();
        assert_eq!(value["operations"]["c_echo"]["success"], 1);
        assert_eq!(value["transfer"]["bytes_received"], 1024);
        assert_eq!(value["associations"]["total_established"], 0);
    }

    #[test]
    fn prometheus_names_are_prefixed() {
        let metrics = PacsMetrics::new();
        metrics.record_operation(DimseOperation::CStore, true, Duration::from_micros(10));
        let text = metrics.to_prometheus();
        assert!(text
            .contains("pacs_operations_total{operation=\"c_store\",outcome=\"success\"} 1"));
        assert!(text.contains("pacs_bytes_received_total 0"));
        for line in text.lines().filter(|l| !l.starts_with('#')) {
            assert!(line.starts_with("pacs_"), "unprefixed metric: {}", line);
        }
    }
}
