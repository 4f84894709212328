//! The modality worklist store.
//!
//! Worklist items are full datasets with patient attributes at the
//! top level and one `(0040,0100) ScheduledProcedureStepSequence`
//! item carrying the step attributes.
//! A modality worklist C-FIND matches top-level keys directly and
//! scheduled-step keys against the sequence item.

use crate::query::MatchRule;
use pacs_core::{Tag, VrKind, VR};
use pacs_dictionary_std::tags;
use pacs_object::InMemObject;
use std::sync::RwLock;

/// An in-memory store of scheduled procedure steps.
#[derive(Debug, Default)]
pub struct WorklistStore {
    items: RwLock<Vec<InMemObject>>,
}

impl WorklistStore {
    /// Create an empty worklist.
    pub fn new() -> Self {
        WorklistStore::default()
    }

    /// Add a scheduled procedure step dataset.
    pub fn add(&self, item: InMemObject) {
        let mut items = self.items.write().expect("worklist lock poisoned");
        items.push(item);
    }

    /// Remove every step whose scheduled procedure step ID matches.
    /// Returns the number of removed items.
    pub fn remove_by_step_id(&self, step_id: &str) -> usize {
        let mut items = self.items.write().expect("worklist lock poisoned");
        let before = items.len();
        items.retain(|item| {
            scheduled_step(item)
                .and_then(|step| step.string_opt(tags::SCHEDULED_PROCEDURE_STEP_ID))
                .as_deref()
                != Some(step_id)
        });
        before - items.len()
    }

    /// The number of scheduled steps.
    pub fn len(&self) -> usize {
        self.items.read().expect("worklist lock poisoned").len()
    }

    /// Whether the worklist is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Answer a modality worklist query:
    /// return the matching items, projected onto the query's keys.
    pub fn query(&self, identifier: &InMemObject) -> Vec<InMemObject> {
        let items = self.items.read().expect("worklist lock poisoned");
        items
            .iter()
            .filter(|item| matches_identifier(item, identifier))
            .map(|item| project(item, identifier))
            .collect()
    }
}

/// Whether an identifier names worklist attributes:
/// used to tell MWL queries apart from Q/R queries
/// when both arrive over C-FIND.
pub fn is_worklist_identifier(identifier: &InMemObject) -> bool {
    identifier.contains(tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE)
}

fn scheduled_step(item: &InMemObject) -> Option<&InMemObject> {
    item.get(tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE)
        .and_then(|e| e.items())
        .and_then(|items| items.first())
}

fn matches_identifier(item: &InMemObject, identifier: &InMemObject) -> bool {
    for key in identifier.iter() {
        let tag = key.header().tag;
        if tag == tags::SPECIFIC_CHARACTER_SET {
            continue;
        }
        if tag == tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE {
            // match the step keys against the item's step
            let step_keys = match key.items().and_then(|items| items.first()) {
                Some(keys) => keys,
                None => continue,
            };
            let step = match scheduled_step(item) {
                Some(step) => step,
                None => return false,
            };
            if !matches_flat(step, step_keys) {
                return false;
            }
            continue;
        }
        if key.vr().kind() == VrKind::Sequence {
            continue;
        }
        if !matches_key(item, tag, key.vr(), key) {
            return false;
        }
    }
    true
}

fn matches_flat(dataset: &InMemObject, keys: &InMemObject) -> bool {
    keys.iter().all(|key| {
        if key.vr().kind() == VrKind::Sequence {
            return true;
        }
        matches_key(dataset, key.header().tag, key.vr(), key)
    })
}

fn matches_key(
    dataset: &InMemObject,
    tag: Tag,
    vr: VR,
    key: &pacs_object::DataElement,
) -> bool {
    let wanted = key.to_str().unwrap_or_default().to_string();
    let rule = MatchRule::for_value(vr, &wanted);
    if rule == MatchRule::Universal {
        return true;
    }
    let candidate = dataset.string_opt(tag).unwrap_or_default();
    rule.matches(&candidate)
}

/// Project a worklist item onto the attributes the query asks for.
fn project(item: &InMemObject, identifier: &InMemObject) -> InMemObject {
    let mut out = InMemObject::new_empty();
    for key in identifier.iter() {
        let tag = key.header().tag;
        if tag == tags::SCHEDULED_PROCEDURE_STEP_SEQUENCE {
            // echo the whole scheduled step
            if let Some(element) = item.get(tag) {
                out.put(element.clone());
            }
            continue;
        }
        if let Some(element) = item.get(tag) {
            out.put(element.clone());
        } else {
            out.put(pacs_object::DataElement::empty(tag, key.vr()));
        }
    }
    out
}
