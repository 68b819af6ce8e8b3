//! Outbound notifications.
//!
//! The chat platform sits behind [`NotificationPort`]. The rotation only ever
//! *sends*; button presses come back in through
//! [`RotationService::respond`](crate::service::RotationService::respond).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{AssignmentType, CandidateRef, ChannelId};
use crate::error::Result;
use crate::scheduler::{Invitation, Partition};

/// Free-standing channel messages about queue events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Announcement {
    Left {
        candidate: CandidateRef,
        cooldown_until: DateTime<Utc>,
    },
    Removed {
        candidate: CandidateRef,
        cooldown_until: DateTime<Utc>,
    },
    Skipped {
        candidate: CandidateRef,
    },
    Started {
        candidate: CandidateRef,
        assignment_type: AssignmentType,
    },
    Finished {
        candidate: CandidateRef,
        forced: bool,
    },
    NobodyBehind,
    ReRackExpired {
        candidate: CandidateRef,
    },
}

impl std::fmt::Display for Announcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Announcement::Left {
                candidate,
                cooldown_until,
            }
            | Announcement::Removed {
                candidate,
                cooldown_until,
            } => write!(
                f,
                "{} has been removed from the queue and is on cooldown until <t:{}:f>.",
                candidate.display_name,
                cooldown_until.timestamp()
            ),
            Announcement::Skipped { candidate } => write!(
                f,
                "{}, you did not reply in time, your space has been skipped.",
                candidate.display_name
            ),
            Announcement::Started {
                candidate,
                assignment_type: AssignmentType::Extra,
            } => write!(
                f,
                "{} is now active and has been removed from the queue.",
                candidate.display_name
            ),
            Announcement::Started { candidate, .. } => {
                write!(f, "{} is now active.", candidate.display_name)
            }
            Announcement::Finished {
                candidate,
                forced: false,
            } => write!(
                f,
                "{} has finished their game, please wait whilst the next storyteller is alerted.",
                candidate.display_name
            ),
            Announcement::Finished {
                candidate,
                forced: true,
            } => write!(
                f,
                "{} has been force finished and removed from the queue.",
                candidate.display_name
            ),
            Announcement::NobodyBehind => write!(f, "Queue is empty after you."),
            Announcement::ReRackExpired { candidate } => {
                write!(f, "{}, the re-rack timer has expired.", candidate.display_name)
            }
        }
    }
}

/// An announcement addressed to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel: ChannelId,
    pub announcement: Announcement,
}

impl Notice {
    pub fn new(channel: ChannelId, announcement: Announcement) -> Self {
        Self {
            channel,
            announcement,
        }
    }
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Offer the turn, with exactly two actions: Start and Leave.
    async fn invite(&self, invitation: &Invitation) -> Result<()>;

    async fn inform_second_in_line(
        &self,
        channel: ChannelId,
        candidate: &CandidateRef,
        partition: Partition,
    ) -> Result<()>;

    async fn announce(&self, channel: ChannelId, announcement: &Announcement) -> Result<()>;
}

/// Writes every notification to the log. Used when no platform bridge is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationPort for TracingNotifier {
    async fn invite(&self, invitation: &Invitation) -> Result<()> {
        tracing::info!(
            invitation_id = %invitation.id,
            candidate = %invitation.candidate.id,
            name = %invitation.candidate.display_name,
            partition = %invitation.partition,
            channel = %invitation.channel,
            deadline = %invitation.deadline,
            "It's your turn! Start or leave the queue"
        );
        Ok(())
    }

    async fn inform_second_in_line(
        &self,
        channel: ChannelId,
        candidate: &CandidateRef,
        partition: Partition,
    ) -> Result<()> {
        tracing::info!(
            candidate = %candidate.id,
            name = %candidate.display_name,
            partition = %partition,
            channel = %channel,
            "You are 2nd in the queue"
        );
        Ok(())
    }

    async fn announce(&self, channel: ChannelId, announcement: &Announcement) -> Result<()> {
        tracing::info!(channel = %channel, "{}", announcement);
        Ok(())
    }
}
