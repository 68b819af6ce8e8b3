use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::candidate::CandidateId;

#[derive(Error, Debug)]
pub enum RotaError {
    #[error("Candidate {0} is already in the queue")]
    AlreadyQueued(CandidateId),

    #[error("Candidate {0} is not in the queue")]
    NotQueued(CandidateId),

    #[error("Candidate {0} has not been a member long enough to join")]
    TooNew(CandidateId),

    #[error("Candidate {candidate} is on cooldown until {until}")]
    OnCooldown {
        candidate: CandidateId,
        until: DateTime<Utc>,
    },

    #[error("Candidate {0} does not hold an active turn")]
    NotActive(CandidateId),

    #[error("Candidate {0} already holds an active turn")]
    AlreadyActive(CandidateId),

    #[error("Invalid queue slot: {0}")]
    InvalidSlot(i64),

    #[error("A cooldown of {0} hours is out of range")]
    InvalidCooldown(u32),

    #[error("Candidate {0} has no cooldown record")]
    NoCooldownRecord(CandidateId),

    #[error("Candidate {0} has no pending invitation")]
    NotInvited(CandidateId),

    #[error("Candidate {0} is not next in line for an extra game")]
    NotEligibleForExtra(CandidateId),

    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl RotaError {
    /// True for rule rejections that a user caused and can read as-is.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            RotaError::Persistence(_) | RotaError::Serialization(_) | RotaError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RotaError>;
