use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, CandidateRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    pub candidate: CandidateRef,
    pub granted_by: CandidateRef,
}

/// Candidates allowed to join regardless of server tenure. There is no revoke path.
#[derive(Debug, Clone, Default)]
pub struct ExceptionRegistry {
    entries: BTreeMap<CandidateId, ExceptionEntry>,
}

impl ExceptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ExceptionEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.candidate.id, e))
                .collect(),
        }
    }

    /// Grant (or re-grant) an exception. The latest grantor wins.
    pub fn grant(&mut self, candidate: CandidateRef, granted_by: CandidateRef) {
        tracing::info!(candidate = %candidate.id, granted_by = %granted_by.id, "Tenure exception granted");
        self.entries.insert(
            candidate.id,
            ExceptionEntry {
                candidate,
                granted_by,
            },
        );
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: CandidateId) -> Option<&ExceptionEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ExceptionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
