//! C-FIND identifier translation and attribute matching.
//!
//! A query identifier is a dataset of keys:
//! present-with-value keys filter,
//! present-with-empty-value keys only select return attributes.
//! Matching supports single value, wildcard (`*`, `?`),
//! DA/TM ranges (`a-b`, `a-`, `-b`), UID lists and universal match.

use crate::catalog::InstanceIndex;
use crate::record::{canonical_person_name, IndexRecord};
use pacs_core::{Tag, VrKind, VR};
use pacs_dictionary_std::tags;
use pacs_object::{DataElement, InMemObject};
use snafu::{Backtrace, OptionExt, Snafu};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A query translation failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The identifier carries no usable query level.
    #[snafu(display("query identifier has no recognizable level"))]
    MissingQueryLevel { backtrace: Backtrace },
    #[snafu(display("unsupported query level `{}`", level))]
    UnsupportedQueryLevel { level: String, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The level of a query/retrieve identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryLevel {
    Patient,
    Study,
    Series,
    Image,
}

impl QueryLevel {
    /// Resolve the value of `(0008,0052)`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim() {
            "PATIENT" => Some(QueryLevel::Patient),
            "STUDY" => Some(QueryLevel::Study),
            "SERIES" => Some(QueryLevel::Series),
            "IMAGE" | "INSTANCE" => Some(QueryLevel::Image),
            _ => None,
        }
    }

    /// The unique key attribute of this level.
    pub fn unique_key(self) -> Tag {
        match self {
            QueryLevel::Patient => tags::PATIENT_ID,
            QueryLevel::Study => tags::STUDY_INSTANCE_UID,
            QueryLevel::Series => tags::SERIES_INSTANCE_UID,
            QueryLevel::Image => tags::SOP_INSTANCE_UID,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            QueryLevel::Patient => "PATIENT",
            QueryLevel::Study => "STUDY",
            QueryLevel::Series => "SERIES",
            QueryLevel::Image => "IMAGE",
        }
    }
}

/// Detect the level of a query identifier from `(0008,0052)`.
pub fn detect_level(identifier: &InMemObject) -> Result<QueryLevel> {
    let keyword = identifier
        .string_opt(tags::QUERY_RETRIEVE_LEVEL)
        .context(MissingQueryLevelSnafu)?;
    QueryLevel::from_keyword(&keyword).context(UnsupportedQueryLevelSnafu { level: keyword })
}

/// One matching rule derived from a query key value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    /// empty value: return-only key, matches everything
    Universal,
    /// exact single value match
    Single(String),
    /// `*`/`?` wildcard match
    Wildcard(String),
    /// date/time range match
    Range {
        lo: Option<String>,
        hi: Option<String>,
    },
    /// list-of-UID match
    List(Vec<String>),
}

impl MatchRule {
    /// Derive the matching rule the standard prescribes
    /// for this key value under its VR.
    pub fn for_value(vr: VR, value: &str) -> MatchRule {
        let value = value.trim();
        if value.is_empty() {
            return MatchRule::Universal;
        }
        if vr == VR::UI && value.contains('\\') {
            return MatchRule::List(value.split('\\').map(str::to_owned).collect());
        }
        if (vr == VR::DA || vr == VR::TM || vr == VR::DT) && value.contains('-') {
            let (lo, hi) = match value.find('-') {
                Some(i) => (&value[..i], &value[i + 1..]),
                None => (value, ""),
            };
            return MatchRule::Range {
                lo: if lo.is_empty() { None } else { Some(lo.to_owned()) },
                hi: if hi.is_empty() { None } else { Some(hi.to_owned()) },
            };
        }
        if value.contains('*') || value.contains('?') {
            return MatchRule::Wildcard(value.to_owned());
        }
        MatchRule::Single(value.to_owned())
    }

    /// Whether a candidate attribute value satisfies this rule.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            MatchRule::Universal => true,
            MatchRule::Single(wanted) => candidate == wanted,
            MatchRule::Wildcard(pattern) => wildcard_match(pattern, candidate),
            // DA and TM values are fixed-width digit strings,
            // so lexicographic comparison is chronological
            MatchRule::Range { lo, hi } => {
                let after_lo = lo.as_deref().map(|lo| candidate >= lo).unwrap_or(true);
                let before_hi = hi.as_deref().map(|hi| candidate <= hi).unwrap_or(true);
                after_lo && before_hi
            }
            MatchRule::List(uids) => uids.iter().any(|uid| uid == candidate),
        }
    }
}

/// `*` matches any run of characters, `?` matches one character.
fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    // dynamic program over pattern and candidate positions
    let mut reachable = vec![false; candidate.len() + 1];
    reachable[0] = true;
    for p in &pattern {
        let mut next = vec![false; candidate.len() + 1];
        match p {
            '*' => {
                let mut any = false;
                for (i, slot) in next.iter_mut().enumerate() {
                    any |= reachable[i];
                    *slot = any;
                }
            }
            '?' => {
                for i in 0..candidate.len() {
                    next[i + 1] = reachable[i];
                }
            }
            c => {
                for i in 0..candidate.len() {
                    next[i + 1] = reachable[i] && candidate[i] == *c;
                }
            }
        }
        reachable = next;
    }
    reachable[candidate.len()]
}

/// The attribute value a record exposes for a given query key,
/// when that key is backed by the index.
fn record_value(record: &IndexRecord, tag: Tag) -> Option<String> {
    if tag == tags::PATIENT_ID {
        Some(record.patient_id.clone())
    } else if tag == tags::PATIENT_NAME {
        Some(record.patient_name.clone())
    } else if tag == tags::MODALITY {
        Some(record.modality.clone())
    } else if tag == tags::STUDY_DATE {
        Some(record.study_date.clone().unwrap_or_default())
    } else if tag == tags::STUDY_INSTANCE_UID {
        Some(record.study_instance_uid.clone())
    } else if tag == tags::SERIES_INSTANCE_UID {
        Some(record.series_instance_uid.clone())
    } else if tag == tags::SOP_INSTANCE_UID {
        Some(record.sop_instance_uid.clone())
    } else if tag == tags::SOP_CLASS_UID {
        Some(record.sop_class_uid.clone())
    } else if tag == tags::SERIES_NUMBER {
        Some(
            record
                .series_number
                .map(|n| n.to_string())
                .unwrap_or_default(),
        )
    } else if tag == tags::INSTANCE_NUMBER {
        Some(
            record
                .instance_number
                .map(|n| n.to_string())
                .unwrap_or_default(),
        )
    } else if tag == tags::ACQUISITION_TIME {
        Some(record.acquisition_time.clone().unwrap_or_default())
    } else {
        None
    }
}

/// Instance-grain records satisfying a query identifier's filters.
///
/// This is the shared front half of C-FIND, C-MOVE and C-GET:
/// retrieval services need the matched records themselves,
/// query services collapse them to the query level.
pub fn matching_records(
    index: &InstanceIndex,
    identifier: &InMemObject,
) -> Result<Vec<Arc<IndexRecord>>> {
    let filters = filters_of(identifier);
    Ok(index
        .snapshot()
        .into_iter()
        .filter(|record| {
            filters.iter().all(|(tag, rule)| {
                record_value(record, *tag)
                    .map(|value| rule.matches(&value))
                    .unwrap_or(false)
            })
        })
        .collect())
}

fn filters_of(identifier: &InMemObject) -> Vec<(Tag, MatchRule)> {
    let mut filters = Vec::new();
    for element in identifier.iter() {
        let tag = element.header().tag;
        if tag == tags::QUERY_RETRIEVE_LEVEL
            || tag == tags::SPECIFIC_CHARACTER_SET
            || element.vr().kind() == VrKind::Sequence
        {
            continue;
        }
        let value = element.to_str().unwrap_or_default().to_string();
        // person names are matched in canonical form
        let value = if element.vr() == VR::PN {
            canonical_person_name(&value)
        } else {
            value
        };
        let rule = MatchRule::for_value(element.vr(), &value);
        if rule != MatchRule::Universal {
            if record_value_is_indexed(tag) {
                filters.push((tag, rule));
            } else {
                tracing::debug!(%tag, "query key is not indexed; not filtering on it");
            }
        }
    }
    filters
}

/// Translate a C-FIND identifier into a catalog query and
/// stream the matching response identifiers.
///
/// The result order is stable for identical queries:
/// ascending by the unique keys of the level hierarchy.
pub fn find(index: &InstanceIndex, identifier: &InMemObject) -> Result<Vec<InMemObject>> {
    let level = detect_level(identifier)?;

    // return keys: every non-sequence key of the identifier
    let mut return_keys: Vec<Tag> = Vec::new();
    for element in identifier.iter() {
        let tag = element.header().tag;
        if tag == tags::QUERY_RETRIEVE_LEVEL || tag == tags::SPECIFIC_CHARACTER_SET {
            continue;
        }
        if element.vr().kind() == VrKind::Sequence {
            tracing::debug!(%tag, "ignoring sequence key in query identifier");
            continue;
        }
        return_keys.push(tag);
    }
    let unique_key = level.unique_key();
    if !return_keys.contains(&unique_key) {
        return_keys.push(unique_key);
    }

    // match at instance grain, then collapse to the query level
    let matching = matching_records(index, identifier)?;

    let mut grouped: BTreeMap<String, &Arc<IndexRecord>> = BTreeMap::new();
    for record in &matching {
        let key = match level {
            QueryLevel::Patient => record.patient_id.clone(),
            QueryLevel::Study => record.study_instance_uid.clone(),
            QueryLevel::Series => format!(
                "{}\\{}",
                record.study_instance_uid, record.series_instance_uid
            ),
            QueryLevel::Image => format!(
                "{}\\{}\\{}",
                record.study_instance_uid, record.series_instance_uid, record.sop_instance_uid
            ),
        };
        grouped.entry(key).or_insert(record);
    }

    let responses = grouped
        .values()
        .map(|record| {
            let mut response = InMemObject::new_empty();
            response.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, level.keyword());
            for &tag in &return_keys {
                let value = record_value(record, tag).unwrap_or_default();
                if value.is_empty() {
                    response.put(DataElement::empty(tag, vr_of(tag)));
                } else {
                    response.put_str(tag, vr_of(tag), value);
                }
            }
            response
        })
        .collect();

    Ok(responses)
}

fn record_value_is_indexed(tag: Tag) -> bool {
    tag == tags::PATIENT_ID
        || tag == tags::PATIENT_NAME
        || tag == tags::MODALITY
        || tag == tags::STUDY_DATE
        || tag == tags::STUDY_INSTANCE_UID
        || tag == tags::SERIES_INSTANCE_UID
        || tag == tags::SOP_INSTANCE_UID
        || tag == tags::SOP_CLASS_UID
        || tag == tags::SERIES_NUMBER
        || tag == tags::INSTANCE_NUMBER
        || tag == tags::ACQUISITION_TIME
}

fn vr_of(tag: Tag) -> VR {
    use pacs_core::dictionary::DataDictionary;
    pacs_dictionary_std::StandardDataDictionary
        .by_tag(tag)
        .map(|e| e.vr)
        .unwrap_or(VR::LO)
}

#[cfg(test)]
mod tests {
    use super::{find, MatchRule, QueryLevel};
    use crate::catalog::InstanceIndex;
    use crate::record::IndexRecord;
    use chrono::Utc;
    use pacs_core::VR;
    use pacs_dictionary_std::tags;
    use pacs_object::{DataElement, InMemObject};
    use std::path::PathBuf;

    fn record(sop: &str, series: &str, study: &str, patient: &str, date: &str) -> IndexRecord {
        IndexRecord {
            sop_instance_uid: sop.to_string(),
            sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
            series_instance_uid: series.to_string(),
            study_instance_uid: study.to_string(),
            patient_id: patient.to_string(),
            patient_name: "DOE^JOHN".to_string(),
            modality: "CT".to_string(),
            study_date: Some(date.to_string()),
            series_number: Some(1),
            instance_number: Some(1),
            slice_location: None,
            image_position_patient: None,
            acquisition_time: None,
            transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
            file_path: PathBuf::from("/data/x.dcm"),
            bytes_on_disk: 100,
            received_at: Utc::now(),
        }
    }

    fn two_study_index() -> InstanceIndex {
        let index = InstanceIndex::new_in_memory();
        index
            .upsert(record("1.2.3.4.5", "1.2.3.1", "1.2.3", "123", "20240115"))
            .unwrap();
        index
            .upsert(record("1.2.9.4.5", "1.2.9.1", "1.2.9", "456", "20240301"))
            .unwrap();
        index
    }

    #[test]
    fn match_rules() {
        assert_eq!(MatchRule::for_value(VR::LO, ""), MatchRule::Universal);
        assert!(MatchRule::for_value(VR::LO, "123").matches("123"));
        assert!(!MatchRule::for_value(VR::LO, "123").matches("1234"));
        assert!(MatchRule::for_value(VR::PN, "DOE*").matches("DOE^JOHN"));
        assert!(MatchRule::for_value(VR::PN, "D?E^JOHN").matches("DOE^JOHN"));
        assert!(!MatchRule::for_value(VR::PN, "D?E").matches("DOE^JOHN"));
        assert!(MatchRule::for_value(VR::UI, "1.2.3\\1.2.9").matches("1.2.9"));
        assert!(!MatchRule::for_value(VR::UI, "1.2.3\\1.2.9").matches("1.2.5"));
    }

    #[test]
    fn date_range_rules() {
        let rule = MatchRule::for_value(VR::DA, "20240101-20240131");
        assert!(rule.matches("20240115"));
        assert!(!rule.matches("20240301"));
        let open_hi = MatchRule::for_value(VR::DA, "20240201-");
        assert!(open_hi.matches("20240301"));
        assert!(!open_hi.matches("20240115"));
        let open_lo = MatchRule::for_value(VR::DA, "-20240131");
        assert!(open_lo.matches("20240115"));
        assert!(!open_lo.matches("20240301"));
    }

    #[test]
    fn study_level_find_by_patient_id() {
        let index = two_study_index();
        let mut identifier = InMemObject::new_empty();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "STUDY");
        identifier.put_str(tags::PATIENT_ID, VR::LO, "123");
        identifier.put(DataElement::empty(tags::STUDY_INSTANCE_UID, VR::UI));
        identifier.put(DataElement::empty(tags::STUDY_DATE, VR::DA));

        let responses = find(&index, &identifier).unwrap();
        assert_eq!(responses.len(), 1);
        let response = &responses[0];
        assert_eq!(response.string(tags::STUDY_INSTANCE_UID).unwrap(), "1.2.3");
        assert_eq!(response.string(tags::STUDY_DATE).unwrap(), "20240115");
        assert_eq!(response.string(tags::QUERY_RETRIEVE_LEVEL).unwrap(), "STUDY");
    }

    #[test]
    fn image_level_lists_each_instance() {
        let index = two_study_index();
        index
            .upsert(record("1.2.3.4.6", "1.2.3.1", "1.2.3", "123", "20240115"))
            .unwrap();
        let mut identifier = InMemObject::new_empty();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "IMAGE");
        identifier.put_str(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.1");
        identifier.put(DataElement::empty(tags::SOP_INSTANCE_UID, VR::UI));

        let responses = find(&index, &identifier).unwrap();
        assert_eq!(responses.len(), 2);
    }

    #[test]
    fn unknown_level_is_an_error() {
        let index = two_study_index();
        let mut identifier = InMemObject::new_empty();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "VOLUME");
        assert!(find(&index, &identifier).is_err());
        assert_eq!(QueryLevel::from_keyword("STUDY"), Some(QueryLevel::Study));
    }

    #[test]
    fn result_order_is_stable() {
        let index = two_study_index();
        let mut identifier = InMemObject::new_empty();
        identifier.put_str(tags::QUERY_RETRIEVE_LEVEL, VR::CS, "STUDY");
        identifier.put(DataElement::empty(tags::STUDY_INSTANCE_UID, VR::UI));
        let first: Vec<String> = find(&index, &identifier)
            .unwrap()
            .iter()
            .map(|r| r.string(tags::STUDY_INSTANCE_UID).unwrap().to_string())
            .collect();
        let second: Vec<String> = find(&index, &identifier)
            .unwrap()
            .iter()
            .map(|r| r.string(tags::STUDY_INSTANCE_UID).unwrap().to_string())
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["1.2.3".to_string(), "1.2.9".to_string()]);
    }
}
