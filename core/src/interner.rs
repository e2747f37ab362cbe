use crate::TermId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Table {
    str_to_id: HashMap<String, TermId>,
    id_to_str: Vec<String>,
}

/// Process-wide bijection between token text and dense term IDs.
///
/// `get_id` may be called concurrently by every block builder of a run; a
/// single lock guards the whole table so all builders share one ID space.
#[derive(Default)]
pub struct TermInterner {
    table: Mutex<Table>,
    vocabulary: Option<HashSet<String>>,
}

/// Serializable copy of the interner, stored alongside the merged index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InternerSnapshot {
    pub terms: Vec<String>,
}

impl TermInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID of `text`, allocating the next sequential one on first sighting.
    pub fn get_id(&self, text: &str) -> TermId {
        let mut table = self.table.lock();
        if let Some(&id) = table.str_to_id.get(text) {
            return id;
        }
        let id = table.id_to_str.len() as TermId;
        table.str_to_id.insert(text.to_string(), id);
        table.id_to_str.push(text.to_string());
        id
    }

    /// Read-only lookup; never allocates an ID.
    pub fn lookup(&self, text: &str) -> Option<TermId> {
        self.table.lock().str_to_id.get(text).copied()
    }

    pub fn get_str(&self, id: TermId) -> Option<String> {
        self.table.lock().id_to_str.get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.lock().id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freezes the membership set used by [`is_in_vocabulary`](Self::is_in_vocabulary).
    /// Call once all terms are known, before serving queries.
    pub fn build_vocabulary(&mut self) {
        let table = self.table.get_mut();
        self.vocabulary = Some(table.id_to_str.iter().cloned().collect());
    }

    pub fn is_in_vocabulary(&self, text: &str) -> bool {
        self.vocabulary.as_ref().is_some_and(|v| v.contains(text))
    }

    /// All known terms in lexicographic order.
    pub fn sorted_terms(&self) -> Vec<String> {
        let mut terms = self.table.lock().id_to_str.clone();
        terms.sort();
        terms
    }

    pub fn snapshot(&self) -> InternerSnapshot {
        InternerSnapshot { terms: self.table.lock().id_to_str.clone() }
    }

    pub fn from_snapshot(snapshot: InternerSnapshot) -> Self {
        let str_to_id = snapshot
            .terms
            .iter()
            .enumerate()
            .map(|(id, t)| (t.clone(), id as TermId))
            .collect();
        Self {
            table: Mutex::new(Table { str_to_id, id_to_str: snapshot.terms }),
            vocabulary: None,
        }
    }
}
