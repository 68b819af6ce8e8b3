//! Per-partition turn offers.
//!
//! A partition is `Idle` until [`evaluate`] publishes an invitation for it,
//! and `AwaitingResponse` until [`expire`] (or a stale-id mismatch) clears
//! that invitation again. The functions here are pure over [`RotaState`]; the
//! service owns the timers and the outbound notifications.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::candidate::CandidateRef;
use crate::config::TimingConfig;
use crate::scheduler::partition::Partition;
use crate::scheduler::pending::Invitation;
use crate::scheduler::queue::QueueEntry;
use crate::state::RotaState;

/// An invitation published by an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOffer {
    pub invitation: Invitation,
    /// Next candidate in the same view, told to get ready.
    pub second_in_line: Option<CandidateRef>,
}

/// Run one evaluation pass over every partition of the current mode.
pub fn evaluate(state: &mut RotaState, timing: &TimingConfig, now: DateTime<Utc>) -> Vec<TurnOffer> {
    if !state.settings.running {
        return Vec::new();
    }

    let mut offers = Vec::new();
    for &partition in state.settings.partitions() {
        if state.active.is_occupied_by(partition.occupancy_types()) {
            continue;
        }
        if state.pending.blocks(partition) {
            continue;
        }

        let (head, second_in_line) = {
            let view = partition.view(&state.queue);
            match view.first() {
                Some(head) => (head.id(), view.get(1).map(|e| e.candidate.clone())),
                None => continue,
            }
        };

        let queue_type = partition.concrete_type(state.settings.merged_queue_type);
        if state.queue.retype(head, queue_type).is_err() {
            continue;
        }
        let Some(candidate) = state.queue.get(head).map(|e| e.candidate.clone()) else {
            continue;
        };

        let invitation = Invitation {
            id: Uuid::new_v4(),
            candidate,
            partition,
            channel: state.settings.channel_for(partition),
            issued_at: now,
            deadline: now + timing.response_window(),
            mode_epoch: state.settings.mode_epoch,
            pause_epoch: state.settings.pause_epoch,
        };
        tracing::info!(
            invitation_id = %invitation.id,
            candidate = %head,
            partition = %partition,
            queue_type = %queue_type,
            deadline = %invitation.deadline,
            "Turn offered"
        );
        state.pending.publish(invitation.clone());
        offers.push(TurnOffer {
            invitation,
            second_in_line,
        });
    }
    offers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Pending,
    /// The candidate left the queue or took the turn some other way.
    Resolved,
}

/// One poll of an in-flight invitation.
///
/// A withdrawn or replaced record counts as resolved: the candidate's queue
/// entry the offer was made to no longer exists.
pub fn observe(state: &RotaState, invitation: &Invitation) -> WaitStatus {
    let id = invitation.candidate.id;
    let current = state
        .pending
        .get(invitation.partition)
        .is_some_and(|inv| inv.id == invitation.id);
    if !current || !state.queue.contains(id) || state.active.is_active(id) {
        WaitStatus::Resolved
    } else {
        WaitStatus::Pending
    }
}

/// Why an expired invitation applied no penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    ModeChanged,
    Paused,
    /// A newer invitation already owns the partition.
    Superseded,
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbandonReason::ModeChanged => write!(f, "mode changed"),
            AbandonReason::Paused => write!(f, "paused"),
            AbandonReason::Superseded => write!(f, "superseded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    Skipped {
        entry: QueueEntry,
        cooldown_until: DateTime<Utc>,
    },
    Abandoned(AbandonReason),
    Resolved,
}

/// Close out an invitation whose wait loop has ended.
///
/// The pending record is always released. The candidate is skipped only if
/// the record was still theirs, they are still queued and inactive, and
/// neither the mode nor the pause state moved since the offer.
pub fn expire(
    state: &mut RotaState,
    invitation: &Invitation,
    timing: &TimingConfig,
    now: DateTime<Utc>,
) -> Expiry {
    if !state.pending.clear(invitation.partition, invitation.id) {
        return match state.pending.get(invitation.partition) {
            Some(_) => Expiry::Abandoned(AbandonReason::Superseded),
            None => Expiry::Resolved,
        };
    }
    if observe(state, invitation) == WaitStatus::Resolved {
        return Expiry::Resolved;
    }
    if state.settings.mode_epoch != invitation.mode_epoch {
        return Expiry::Abandoned(AbandonReason::ModeChanged);
    }
    if !state.settings.running || state.settings.pause_epoch != invitation.pause_epoch {
        return Expiry::Abandoned(AbandonReason::Paused);
    }

    match state.leave(invitation.candidate.id, timing, now) {
        Ok(removal) => {
            tracing::info!(
                invitation_id = %invitation.id,
                candidate = %invitation.candidate.id,
                cooldown_until = %removal.cooldown_until,
                "Invitation expired, candidate skipped"
            );
            Expiry::Skipped {
                entry: removal.entry,
                cooldown_until: removal.cooldown_until,
            }
        }
        Err(_) => Expiry::Resolved,
    }
}
