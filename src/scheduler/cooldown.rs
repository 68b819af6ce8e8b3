use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, CandidateRef};
use crate::error::{Result, RotaError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub candidate: CandidateRef,
    /// Re-joining is blocked until this instant.
    #[serde(default)]
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Throttle window for clearing one's own cooldown.
    #[serde(default)]
    pub self_release_until: Option<DateTime<Utc>>,
}

impl CooldownEntry {
    pub fn new(candidate: CandidateRef) -> Self {
        Self {
            candidate,
            cooldown_until: None,
            self_release_until: None,
        }
    }
}

/// Per-candidate cooldown clocks. Records are created lazily and never deleted.
#[derive(Debug, Clone, Default)]
pub struct CooldownStore {
    entries: BTreeMap<CandidateId, CooldownEntry>,
}

impl CooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = CooldownEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.candidate.id, e))
                .collect(),
        }
    }

    /// Ensure a record exists. An existing record is left untouched.
    pub fn touch(&mut self, candidate: &CandidateRef) -> &CooldownEntry {
        self.entries
            .entry(candidate.id)
            .or_insert_with(|| CooldownEntry::new(candidate.clone()))
    }

    pub fn is_blocked(&self, id: CandidateId, now: DateTime<Utc>) -> bool {
        self.cooldown_until(id, now).is_some()
    }

    /// The end of the candidate's cooldown, if it is still running at `now`.
    pub fn cooldown_until(&self, id: CandidateId, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries
            .get(&id)
            .and_then(|e| e.cooldown_until)
            .filter(|until| *until > now)
    }

    /// Set the cooldown, creating the record if needed.
    pub fn set_cooldown(&mut self, candidate: &CandidateRef, until: DateTime<Utc>) {
        self.entries
            .entry(candidate.id)
            .or_insert_with(|| CooldownEntry::new(candidate.clone()))
            .cooldown_until = Some(until);
    }

    /// End a running cooldown at `now`.
    pub fn clear_cooldown(&mut self, id: CandidateId, now: DateTime<Utc>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(RotaError::NoCooldownRecord(id))?;
        entry.cooldown_until = Some(now);
        Ok(())
    }

    pub fn set_self_release_window(&mut self, id: CandidateId, until: DateTime<Utc>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(RotaError::NoCooldownRecord(id))?;
        entry.self_release_until = Some(until);
        Ok(())
    }

    pub fn clear_self_release_window(&mut self, id: CandidateId, now: DateTime<Utc>) -> Result<()> {
        self.set_self_release_window(id, now)
    }

    pub fn get(&self, id: CandidateId) -> Option<&CooldownEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CooldownEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
