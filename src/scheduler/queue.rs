use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, CandidateRef, QueueType};
use crate::error::{Result, RotaError};

/// Notes are cut to this many characters when an entry is written.
pub const MAX_NOTES_CHARS: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub candidate: CandidateRef,
    pub queue_type: QueueType,
    /// 1-based rank in the merged queue.
    pub position: u32,
    #[serde(default)]
    pub notes: String,
}

impl QueueEntry {
    pub fn new(candidate: CandidateRef, queue_type: QueueType, notes: &str) -> Self {
        Self {
            candidate,
            queue_type,
            position: 0,
            notes: notes.chars().take(MAX_NOTES_CHARS).collect(),
        }
    }

    pub fn id(&self) -> CandidateId {
        self.candidate.id
    }
}

/// Ordered queue of waiting candidates.
///
/// Entries are kept in rank order; `position` is rewritten to the dense
/// sequence `1..=N` after every mutation.
#[derive(Debug, Clone, Default)]
pub struct QueueStore {
    entries: Vec<QueueEntry>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted entries, ordering by their stored positions.
    pub fn from_entries(entries: impl IntoIterator<Item = QueueEntry>) -> Self {
        let mut entries: Vec<QueueEntry> = entries.into_iter().collect();
        entries.sort_by_key(|e| e.position);
        let mut store = Self { entries };
        store.reindex();
        store
    }

    /// Append an entry at the back of the queue.
    pub fn insert(&mut self, mut entry: QueueEntry) -> Result<u32> {
        if self.contains(entry.id()) {
            return Err(RotaError::AlreadyQueued(entry.id()));
        }
        entry.position = self.entries.len() as u32 + 1;
        self.entries.push(entry);
        self.reindex();
        Ok(self.entries.len() as u32)
    }

    pub fn remove(&mut self, id: CandidateId) -> Result<QueueEntry> {
        let index = self.index_of(id).ok_or(RotaError::NotQueued(id))?;
        let entry = self.entries.remove(index);
        self.reindex();
        Ok(entry)
    }

    /// Reassign every position to its rank.
    pub fn reindex(&mut self) {
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            entry.position = idx as u32 + 1;
        }
    }

    /// Move a candidate so that it ends up at rank `slot`, clamped to the queue length.
    pub fn set_position(&mut self, id: CandidateId, slot: i64) -> Result<u32> {
        let index = self.index_of(id).ok_or(RotaError::NotQueued(id))?;
        if slot < 1 {
            return Err(RotaError::InvalidSlot(slot));
        }
        let entry = self.entries.remove(index);
        let rank = (slot as usize).min(self.entries.len() + 1);
        self.insert_before(entry, rank);
        Ok(rank as u32)
    }

    /// Place `entry` so it holds `rank` (1-based) once the store is reindexed.
    fn insert_before(&mut self, entry: QueueEntry, rank: usize) {
        let at = rank.saturating_sub(1).min(self.entries.len());
        self.entries.insert(at, entry);
        self.reindex();
    }

    /// Entries waiting for `queue_type`, including those that accept any game.
    pub fn by_partition(&self, queue_type: QueueType) -> Vec<&QueueEntry> {
        self.entries
            .iter()
            .filter(|e| e.queue_type == queue_type || e.queue_type == QueueType::Any)
            .collect()
    }

    /// Every entry, in rank order.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn get(&self, id: CandidateId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.index_of(id).is_some()
    }

    /// Rewrite the queue type of an entry in place.
    pub fn retype(&mut self, id: CandidateId, queue_type: QueueType) -> Result<()> {
        let index = self.index_of(id).ok_or(RotaError::NotQueued(id))?;
        self.entries[index].queue_type = queue_type;
        Ok(())
    }

    /// Drop every entry whose type is exactly `queue_type`. Returns what was removed.
    pub fn remove_where(&mut self, queue_type: QueueType) -> Vec<QueueEntry> {
        let (removed, kept): (Vec<QueueEntry>, Vec<QueueEntry>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.queue_type == queue_type);
        self.entries = kept;
        self.reindex();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, id: CandidateId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}
