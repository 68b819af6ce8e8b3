use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidate::{AssignmentType, CandidateId, CandidateRef};
use crate::error::{Result, RotaError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAssignment {
    pub candidate: CandidateRef,
    pub assignment_type: AssignmentType,
}

/// Candidates currently holding a turn.
#[derive(Debug, Clone, Default)]
pub struct ActiveAssignmentTracker {
    assignments: BTreeMap<CandidateId, ActiveAssignment>,
}

impl ActiveAssignmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assignments(assignments: impl IntoIterator<Item = ActiveAssignment>) -> Self {
        Self {
            assignments: assignments
                .into_iter()
                .map(|a| (a.candidate.id, a))
                .collect(),
        }
    }

    /// True if any non-Extra turn is being held.
    pub fn is_occupied(&self) -> bool {
        self.assignments
            .values()
            .any(|a| a.assignment_type != AssignmentType::Extra)
    }

    /// True if any held turn has one of `types`.
    pub fn is_occupied_by(&self, types: &[AssignmentType]) -> bool {
        self.assignments
            .values()
            .any(|a| types.contains(&a.assignment_type))
    }

    /// Global-flag view of a single candidate: reports false while every held
    /// turn is Extra, even for the Extra holder itself.
    pub fn is_active(&self, id: CandidateId) -> bool {
        self.is_occupied() && self.assignments.contains_key(&id)
    }

    /// Plain membership, independent of the Extra rule.
    pub fn contains(&self, id: CandidateId) -> bool {
        self.assignments.contains_key(&id)
    }

    pub fn assign(
        &mut self,
        candidate: CandidateRef,
        assignment_type: AssignmentType,
    ) -> Result<&ActiveAssignment> {
        if self.assignments.contains_key(&candidate.id) {
            return Err(RotaError::AlreadyActive(candidate.id));
        }
        tracing::info!(candidate = %candidate.id, assignment_type = %assignment_type, "Turn assigned");
        let id = candidate.id;
        Ok(self.assignments.entry(id).or_insert(ActiveAssignment {
            candidate,
            assignment_type,
        }))
    }

    pub fn release(&mut self, id: CandidateId) -> Result<ActiveAssignment> {
        let released = self.assignments.remove(&id).ok_or(RotaError::NotActive(id))?;
        tracing::info!(candidate = %id, assignment_type = %released.assignment_type, "Turn released");
        Ok(released)
    }

    pub fn get(&self, id: CandidateId) -> Option<&ActiveAssignment> {
        self.assignments.get(&id)
    }

    pub fn assignments(&self) -> impl Iterator<Item = &ActiveAssignment> {
        self.assignments.values()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
