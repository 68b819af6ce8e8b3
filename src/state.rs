//! The single authoritative rotation state.
//!
//! Every rule lives here as a synchronous method over [`RotaState`]. The
//! service clones the state, applies one of these methods, persists the
//! result and only then swaps it in, so a rejected or failed command never
//! leaves a partial mutation behind.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{AssignmentType, CandidateId, CandidateRef, ChannelId, QueueType};
use crate::config::{ChannelBindings, TimingConfig};
use crate::error::{Result, RotaError};
use crate::persistence::Snapshot;
use crate::scheduler::{
    ActiveAssignment, ActiveAssignmentTracker, CooldownStore, EligibilityGate, ExceptionRegistry,
    Invitation, Mode, Partition, PendingInvitations, QueueEntry, QueueStore, RotationSettings,
};

/// Notes written on entries added by an admin.
pub const ADMIN_ADDED_NOTE: &str = "Mod Added to Queue";

#[derive(Debug, Clone)]
pub struct RotaState {
    pub queue: QueueStore,
    pub cooldowns: CooldownStore,
    pub active: ActiveAssignmentTracker,
    pub exceptions: ExceptionRegistry,
    pub settings: RotationSettings,
    pub pending: PendingInvitations,
}

/// A candidate taken out of the queue together with the cooldown they received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Removal {
    pub entry: QueueEntry,
    pub cooldown_until: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionView {
    pub partition: Partition,
    pub entries: Vec<QueueEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueView {
    pub mode: Mode,
    pub running: bool,
    pub partitions: Vec<PartitionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub mode: Mode,
    pub running: bool,
    pub queued: usize,
    pub active: Vec<ActiveAssignment>,
    pub pending: Vec<Invitation>,
    pub channels: ChannelBindings,
}

impl RotaState {
    pub fn new(settings: RotationSettings) -> Self {
        Self {
            queue: QueueStore::new(),
            cooldowns: CooldownStore::new(),
            active: ActiveAssignmentTracker::new(),
            exceptions: ExceptionRegistry::new(),
            settings,
            pending: PendingInvitations::new(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            queue: self
                .queue
                .entries()
                .iter()
                .map(|e| (e.id(), e.clone()))
                .collect(),
            cooldowns: self
                .cooldowns
                .entries()
                .map(|e| (e.candidate.id, e.clone()))
                .collect(),
            active: self
                .active
                .assignments()
                .map(|a| (a.candidate.id, a.clone()))
                .collect(),
            exceptions: self
                .exceptions
                .entries()
                .map(|e| (e.candidate.id, e.clone()))
                .collect(),
        }
    }

    /// Replace the four stores. Settings and pending invitations are kept; an
    /// invitation whose candidate vanished resolves at its next poll.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let mut active_ids = HashSet::new();
        self.active = ActiveAssignmentTracker::from_assignments(snapshot.active.into_values().map(
            |a| {
                active_ids.insert(a.candidate.id);
                a
            },
        ));
        // A candidate is never both queued and active; the active record wins.
        self.queue = QueueStore::from_entries(
            snapshot
                .queue
                .into_values()
                .filter(|e| !active_ids.contains(&e.id())),
        );
        self.cooldowns = CooldownStore::from_entries(snapshot.cooldowns.into_values());
        self.exceptions = ExceptionRegistry::from_entries(snapshot.exceptions.into_values());
    }

    pub fn gate(&self, tenure: Duration) -> EligibilityGate<'_> {
        EligibilityGate {
            queue: &self.queue,
            cooldowns: &self.cooldowns,
            active: &self.active,
            exceptions: &self.exceptions,
            tenure,
        }
    }

    pub fn join(
        &mut self,
        candidate: &CandidateRef,
        joined_at: DateTime<Utc>,
        queue_type: QueueType,
        notes: &str,
        timing: &TimingConfig,
        now: DateTime<Utc>,
    ) -> Result<QueueEntry> {
        let admission = self
            .gate(timing.tenure())
            .can_join(candidate, joined_at, queue_type, notes, now)?;
        self.cooldowns.touch(&admission.cooldown.candidate);
        self.queue.insert(admission.entry)?;
        self.queued_entry(candidate.id)
    }

    /// Self-removal. Applies the leave cooldown.
    pub fn leave(
        &mut self,
        id: CandidateId,
        timing: &TimingConfig,
        now: DateTime<Utc>,
    ) -> Result<Removal> {
        let entry = self.queue.remove(id)?;
        self.pending.withdraw(id);
        let cooldown_until = now + timing.leave_cooldown();
        self.cooldowns.set_cooldown(&entry.candidate, cooldown_until);
        Ok(Removal {
            entry,
            cooldown_until,
        })
    }

    /// Take a queued candidate's turn: the entry's own type, with `Any`
    /// following the candidate's pending invitation when there is one.
    pub fn promote(
        &mut self,
        id: CandidateId,
        timing: &TimingConfig,
        now: DateTime<Utc>,
    ) -> Result<ActiveAssignment> {
        let entry = self.queue.get(id).ok_or(RotaError::NotQueued(id))?;
        let assignment_type = match entry.queue_type {
            QueueType::Any => self
                .pending
                .find_by_candidate(id)
                .map(|inv| {
                    inv.partition
                        .concrete_type(self.settings.merged_queue_type)
                        .into()
                })
                .unwrap_or(AssignmentType::Any),
            other => other.into(),
        };
        self.take_turn(id, assignment_type, timing, now)
    }

    /// Start an extra game outside the rotation. Only the head of a queue view may.
    pub fn start_extra(
        &mut self,
        id: CandidateId,
        timing: &TimingConfig,
        now: DateTime<Utc>,
    ) -> Result<ActiveAssignment> {
        let is_head = self.settings.partitions().iter().any(|p| {
            p.view(&self.queue)
                .first()
                .is_some_and(|head| head.id() == id)
        });
        if !is_head || self.active.is_active(id) {
            return Err(RotaError::NotEligibleForExtra(id));
        }
        self.take_turn(id, AssignmentType::Extra, timing, now)
    }

    fn take_turn(
        &mut self,
        id: CandidateId,
        assignment_type: AssignmentType,
        timing: &TimingConfig,
        now: DateTime<Utc>,
    ) -> Result<ActiveAssignment> {
        if self.active.contains(id) {
            return Err(RotaError::AlreadyActive(id));
        }
        let entry = self.queue.remove(id)?;
        self.pending.withdraw(id);
        self.cooldowns
            .set_cooldown(&entry.candidate, now + timing.join_cooldown());
        Ok(self.active.assign(entry.candidate, assignment_type)?.clone())
    }

    /// Release a held turn, optionally moving the partition's channel to where
    /// the finish came from.
    pub fn finish(&mut self, id: CandidateId, channel: Option<ChannelId>) -> Result<ActiveAssignment> {
        let released = self.active.release(id)?;
        if let Some(channel) = channel {
            self.settings
                .channels
                .rebind(released.assignment_type, channel);
        }
        Ok(released)
    }

    pub fn set_position(&mut self, id: CandidateId, slot: i64) -> Result<u32> {
        self.queue.set_position(id, slot)
    }

    /// Admin add. Skips the tenure and cooldown gates but not the queue rules.
    pub fn add_player(
        &mut self,
        candidate: CandidateRef,
        queue_type: QueueType,
        notes: Option<&str>,
    ) -> Result<QueueEntry> {
        if self.active.contains(candidate.id) {
            return Err(RotaError::AlreadyActive(candidate.id));
        }
        let id = candidate.id;
        self.cooldowns.touch(&candidate);
        self.queue.insert(QueueEntry::new(
            candidate,
            queue_type,
            notes.unwrap_or(ADMIN_ADDED_NOTE),
        ))?;
        self.queued_entry(id)
    }

    /// Drop every entry of exactly `queue_type` and append `candidates` in order.
    /// Listed candidates queued under another type are moved.
    pub fn replace_partition(
        &mut self,
        queue_type: QueueType,
        candidates: Vec<CandidateRef>,
    ) -> Result<usize> {
        if let Some(busy) = candidates.iter().find(|c| self.active.contains(c.id)) {
            return Err(RotaError::AlreadyActive(busy.id));
        }
        let removed = self.queue.remove_where(queue_type);
        for entry in &removed {
            self.pending.withdraw(entry.id());
        }
        tracing::debug!(queue_type = %queue_type, removed = removed.len(), "Partition cleared");

        let mut seen = HashSet::new();
        for candidate in candidates {
            if !seen.insert(candidate.id) {
                continue;
            }
            if self.queue.contains(candidate.id) {
                self.queue.remove(candidate.id)?;
                self.pending.withdraw(candidate.id);
            }
            self.cooldowns.touch(&candidate);
            self.queue
                .insert(QueueEntry::new(candidate, queue_type, ADMIN_ADDED_NOTE))?;
        }
        Ok(seen.len())
    }

    /// Fails with `InvalidCooldown` when the end would fall outside the calendar.
    pub fn add_cooldown(
        &mut self,
        candidate: &CandidateRef,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let until = now
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .ok_or(RotaError::InvalidCooldown(hours))?;
        self.cooldowns.set_cooldown(candidate, until);
        Ok(until)
    }

    pub fn admin_clear_cooldown(&mut self, id: CandidateId, now: DateTime<Utc>) -> Result<()> {
        self.cooldowns.clear_cooldown(id, now)
    }

    /// Clear one's own cooldown and open the throttle window. The window from a
    /// previous self-clear is not consulted.
    pub fn self_clear_cooldown(
        &mut self,
        id: CandidateId,
        timing: &TimingConfig,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        self.cooldowns.clear_cooldown(id, now)?;
        let window = now + timing.self_release_window();
        self.cooldowns.set_self_release_window(id, window)?;
        Ok(window)
    }

    pub fn admin_clear_self_release_window(
        &mut self,
        id: CandidateId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.cooldowns.clear_self_release_window(id, now)
    }

    pub fn grant_exception(&mut self, candidate: CandidateRef, granted_by: CandidateRef) {
        self.exceptions.grant(candidate, granted_by);
    }

    pub fn queue_view(&self) -> QueueView {
        QueueView {
            mode: self.settings.mode,
            running: self.settings.running,
            partitions: self
                .settings
                .partitions()
                .iter()
                .map(|&partition| PartitionView {
                    partition,
                    entries: partition.view(&self.queue).into_iter().cloned().collect(),
                })
                .collect(),
        }
    }

    pub fn status(&self) -> StatusView {
        StatusView {
            mode: self.settings.mode,
            running: self.settings.running,
            queued: self.queue.len(),
            active: self.active.assignments().cloned().collect(),
            pending: self.pending.iter().cloned().collect(),
            channels: self.settings.channels,
        }
    }

    fn queued_entry(&self, id: CandidateId) -> Result<QueueEntry> {
        self.queue.get(id).cloned().ok_or(RotaError::NotQueued(id))
    }
}
