//! Bidirectional mapping between original and anonymized UIDs.

use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Maps {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

/// A symmetric UID map under a configured root.
///
/// Every `get_or_create` maintains both directions atomically;
/// repeated calls with the same original return the identical
/// anonymized UID for the lifetime of the mapping.
/// Lookups take the read side of the lock and never block
/// each other; creation takes the write side.
#[derive(Debug)]
pub struct UidMapping {
    /// the UID arc new identifiers are minted under
    root: String,
    /// a per-mapping component keeping independent mappings disjoint
    session: u64,
    sequence: AtomicU64,
    maps: RwLock<Maps>,
}

impl UidMapping {
    /// Create a mapping minting UIDs under the given root arc.
    pub fn new(root: impl Into<String>) -> Self {
        UidMapping {
            root: root.into(),
            session: rand::thread_rng().gen::<u64>() >> 16,
            sequence: AtomicU64::new(0),
            maps: RwLock::new(Maps::default()),
        }
    }

    /// The root arc of minted UIDs.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The anonymized UID of an original, minting one on first sight.
    pub fn get_or_create(&self, original: &str) -> String {
        if let Some(existing) = self.get_anonymized(original) {
            return existing;
        }
        let mut maps = self.maps.write().expect("uid mapping lock poisoned");
        // a racing writer may have minted it meanwhile
        if let Some(existing) = maps.forward.get(original) {
            return existing.clone();
        }
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let anonymized = format!("{}.{}.{}", self.root, self.session, sequence);
        maps.forward
            .insert(original.to_string(), anonymized.clone());
        maps.reverse
            .insert(anonymized.clone(), original.to_string());
        anonymized
    }

    /// Look up the anonymized UID of an original, if mapped.
    pub fn get_anonymized(&self, original: &str) -> Option<String> {
        let maps = self.maps.read().expect("uid mapping lock poisoned");
        maps.forward.get(original).cloned()
    }

    /// Look up the original UID of an anonymized one, if mapped.
    pub fn get_original(&self, anonymized: &str) -> Option<String> {
        let maps = self.maps.read().expect("uid mapping lock poisoned");
        maps.reverse.get(anonymized).cloned()
    }

    /// The number of mapped pairs.
    pub fn len(&self) -> usize {
        let maps = self.maps.read().expect("uid mapping lock poisoned");
        maps.forward.len()
    }

    /// Whether no pair has been mapped yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UidMapping {
    fn default() -> Self {
        // the UUID-derived arc reserved for locally minted UIDs
        UidMapping::new("2.25")
    }
}

#[cfg(test)]
mod tests {
    use super::UidMapping;
    use std::sync::Arc;

    #[test]
    fn symmetric_and_deterministic() {
        let mapping = UidMapping::default();
        let anonymized = mapping.get_or_create("1.2.3");
        assert_eq!(mapping.get_or_create("1.2.3"), anonymized);
        assert_eq!(mapping.get_original(&anonymized).as_deref(), Some("1.2.3"));
        assert_eq!(
            mapping.get_anonymized("1.2.3").as_deref(),
            Some(anonymized.as_str())
        );
        assert_ne!(anonymized, "1.2.3");
        assert!(anonymized.starts_with("2.25."));
    }

    #[test]
    fn distinct_originals_get_distinct_uids() {
        let mapping = UidMapping::default();
        let a = mapping.get_or_create("1.2.3");
        let b = mapping.get_or_create("1.2.4");
        assert_ne!(a, b);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn uids_stay_within_length_limit() {
        let mapping = UidMapping::default();
        for i in 0..100 {
            let uid = mapping.get_or_create(&format!("1.2.3.{}", i));
            assert!(uid.len() <= 64, "UID too long: {}", uid);
        }
    }

    #[test]
    fn concurrent_minting_is_consistent() {
        let mapping = Arc::new(UidMapping::default());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let mapping = Arc::clone(&mapping);
            handles.push(std::thread::spawn(move || mapping.get_or_create("1.2.3")));
        }
        let uids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(uids.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(mapping.len(), 1);
    }
}
