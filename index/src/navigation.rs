//! Ordered traversal of the instances of a series.

use crate::catalog::InstanceIndex;
use crate::record::IndexRecord;
use std::cmp::Ordering;
use std::sync::Arc;

/// The available sort orders for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// by spatial position along the normal (z first)
    Position,
    /// by `(0020,0013) InstanceNumber`
    InstanceNumber,
    /// by `(0008,0032) AcquisitionTime`
    AcquisitionTime,
}

/// The neighborhood of one instance within its sorted series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesNeighborhood {
    pub prev: Option<String>,
    pub next: Option<String>,
    pub first: String,
    pub last: String,
    /// zero-based position of the instance in the sorted series
    pub index: usize,
    pub total: usize,
}

fn compare(a: &IndexRecord, b: &IndexRecord, order: SortOrder) -> Ordering {
    let primary = match order {
        SortOrder::Position => a
            .z_position()
            .partial_cmp(&b.z_position())
            .unwrap_or(Ordering::Equal),
        SortOrder::InstanceNumber => a.instance_number.cmp(&b.instance_number),
        SortOrder::AcquisitionTime => a.acquisition_time.cmp(&b.acquisition_time),
    };
    // tie-break: z position, then instance number, then SOP UID
    primary
        .then_with(|| {
            a.z_position()
                .partial_cmp(&b.z_position())
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.instance_number.cmp(&b.instance_number))
        .then_with(|| a.sop_instance_uid.cmp(&b.sop_instance_uid))
}

/// The instances of a series, sorted under the given order.
pub fn series_instances(
    index: &InstanceIndex,
    series_instance_uid: &str,
    order: SortOrder,
) -> Vec<String> {
    let mut records: Vec<Arc<IndexRecord>> = index.records_in_series(series_instance_uid);
    records.sort_by(|a, b| compare(a, b, order));
    records
        .iter()
        .map(|record| record.sop_instance_uid.clone())
        .collect()
}

/// Locate an instance within its sorted series and derive its
/// neighborhood. Returns `None` when the series or instance
/// is unknown.
pub fn neighborhood(
    index: &InstanceIndex,
    series_instance_uid: &str,
    sop_instance_uid: &str,
    order: SortOrder,
) -> Option<SeriesNeighborhood> {
    let sorted = series_instances(index, series_instance_uid, order);
    let position = sorted.iter().position(|uid| uid == sop_instance_uid)?;
    Some(SeriesNeighborhood {
        prev: position.checked_sub(1).map(|i| sorted[i].clone()),
        next: sorted.get(position + 1).cloned(),
        first: sorted.first()?.clone(),
        last: sorted.last()?.clone(),
        index: position,
        total: sorted.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::{neighborhood, series_instances, SortOrder};
    use crate::catalog::InstanceIndex;
    use crate::record::IndexRecord;
    use chrono::Utc;
    use std::path::PathBuf;

    fn slice(sop: &str, z: f64, number: i32) -> IndexRecord {
        IndexRecord {
            sop_instance_uid: sop.to_string(),
            sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
            series_instance_uid: "1.2.3.1".to_string(),
            study_instance_uid: "1.2.3".to_string(),
            patient_id: "123".to_string(),
            patient_name: "DOE^JOHN".to_string(),
            modality: "CT".to_string(),
            study_date: None,
            series_number: Some(1),
            instance_number: Some(number),
            slice_location: None,
            image_position_patient: Some([0.0, 0.0, z]),
            acquisition_time: None,
            transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
            file_path: PathBuf::from("/data/x.dcm"),
            bytes_on_disk: 100,
            received_at: Utc::now(),
        }
    }

    fn series() -> InstanceIndex {
        let index = InstanceIndex::new_in_memory();
        // inserted out of order on purpose
        index.upsert(slice("1.2.3.1.3", 10.0, 3)).unwrap();
        index.upsert(slice("1.2.3.1.1", -10.0, 1)).unwrap();
        index.upsert(slice("1.2.3.1.2", 0.0, 2)).unwrap();
        index
    }

    #[test]
    fn position_order_sorts_by_z() {
        let index = series();
        let sorted = series_instances(&index, "1.2.3.1", SortOrder::Position);
        assert_eq!(sorted, vec!["1.2.3.1.1", "1.2.3.1.2", "1.2.3.1.3"]);
    }

    #[test]
    fn instance_number_order() {
        let index = series();
        let sorted = series_instances(&index, "1.2.3.1", SortOrder::InstanceNumber);
        assert_eq!(sorted, vec!["1.2.3.1.1", "1.2.3.1.2", "1.2.3.1.3"]);
    }

    #[test]
    fn neighborhood_of_middle_slice() {
        let index = series();
        let hood = neighborhood(&index, "1.2.3.1", "1.2.3.1.2", SortOrder::Position).unwrap();
        assert_eq!(hood.prev.as_deref(), Some("1.2.3.1.1"));
        assert_eq!(hood.next.as_deref(), Some("1.2.3.1.3"));
        assert_eq!(hood.first, "1.2.3.1.1");
        assert_eq!(hood.last, "1.2.3.1.3");
        assert_eq!(hood.index, 1);
        assert_eq!(hood.total, 3);
    }

    #[test]
    fn neighborhood_at_the_edges() {
        let index = series();
        let first = neighborhood(&index, "1.2.3.1", "1.2.3.1.1", SortOrder::Position).unwrap();
        assert!(first.prev.is_none());
        let last = neighborhood(&index, "1.2.3.1", "1.2.3.1.3", SortOrder::Position).unwrap();
        assert!(last.next.is_none());
    }

    #[test]
    fn unknown_instance_has_no_neighborhood() {
        let index = series();
        assert!(neighborhood(&index, "1.2.3.1", "9.9", SortOrder::Position).is_none());
        assert!(neighborhood(&index, "9.9", "1.2.3.1.1", SortOrder::Position).is_none());
    }
}
