use chrono::{DateTime, Duration, Utc};

use crate::candidate::{CandidateRef, QueueType};
use crate::error::{Result, RotaError};
use crate::scheduler::active::ActiveAssignmentTracker;
use crate::scheduler::cooldown::{CooldownEntry, CooldownStore};
use crate::scheduler::exceptions::ExceptionRegistry;
use crate::scheduler::queue::{QueueEntry, QueueStore};

/// What a successful join writes: the new queue entry and the cooldown record to touch.
#[derive(Debug, Clone)]
pub struct Admission {
    pub entry: QueueEntry,
    pub cooldown: CooldownEntry,
}

/// Read-only join check over the stores.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityGate<'a> {
    pub queue: &'a QueueStore,
    pub cooldowns: &'a CooldownStore,
    pub active: &'a ActiveAssignmentTracker,
    pub exceptions: &'a ExceptionRegistry,
    /// Minimum membership age before a candidate may join.
    pub tenure: Duration,
}

impl<'a> EligibilityGate<'a> {
    pub fn can_join(
        &self,
        candidate: &CandidateRef,
        joined_at: DateTime<Utc>,
        queue_type: QueueType,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let id = candidate.id;
        if self.queue.contains(id) {
            return Err(RotaError::AlreadyQueued(id));
        }
        if self.active.contains(id) {
            return Err(RotaError::AlreadyActive(id));
        }
        if now - joined_at < self.tenure && !self.exceptions.contains(id) {
            return Err(RotaError::TooNew(id));
        }
        if let Some(until) = self.cooldowns.cooldown_until(id, now) {
            return Err(RotaError::OnCooldown {
                candidate: id,
                until,
            });
        }

        let cooldown = self
            .cooldowns
            .get(id)
            .cloned()
            .unwrap_or_else(|| CooldownEntry::new(candidate.clone()));

        Ok(Admission {
            entry: QueueEntry::new(candidate.clone(), queue_type, notes),
            cooldown,
        })
    }
}
