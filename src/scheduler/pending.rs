use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidate::{CandidateId, CandidateRef, ChannelId};
use crate::scheduler::partition::Partition;

/// A published turn offer awaiting the candidate's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub candidate: CandidateRef,
    pub partition: Partition,
    pub channel: ChannelId,
    pub issued_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    /// Settings epochs captured when the offer was made.
    pub mode_epoch: u64,
    pub pause_epoch: u64,
}

/// In-flight invitations, at most one per partition.
///
/// The command layer resolves Start/Leave responses by looking the candidate up
/// here instead of holding a per-invitation callback.
#[derive(Debug, Clone, Default)]
pub struct PendingInvitations {
    by_partition: HashMap<Partition, Invitation>,
}

impl PendingInvitations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, invitation: Invitation) {
        self.by_partition.insert(invitation.partition, invitation);
    }

    pub fn get(&self, partition: Partition) -> Option<&Invitation> {
        self.by_partition.get(&partition)
    }

    pub fn find_by_candidate(&self, id: CandidateId) -> Option<&Invitation> {
        self.by_partition.values().find(|inv| inv.candidate.id == id)
    }

    /// True if an invitation is in flight on `partition` or one overlapping it.
    pub fn blocks(&self, partition: Partition) -> bool {
        self.by_partition.keys().any(|p| p.overlaps(partition))
    }

    /// Remove the record for `partition`, but only if it is still invitation `id`.
    pub fn clear(&mut self, partition: Partition, id: Uuid) -> bool {
        match self.by_partition.get(&partition) {
            Some(inv) if inv.id == id => {
                self.by_partition.remove(&partition);
                true
            }
            _ => false,
        }
    }

    /// Drop whatever invitation is out for `id`. Called whenever the candidate
    /// leaves the queue so a later entry is never judged by an older offer.
    pub fn withdraw(&mut self, id: CandidateId) -> Option<Invitation> {
        let partition = self.find_by_candidate(id)?.partition;
        self.by_partition.remove(&partition)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invitation> {
        self.by_partition.values()
    }

    pub fn len(&self) -> usize {
        self.by_partition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_partition.is_empty()
    }
}
