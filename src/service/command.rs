//! Commands as data, for adapters that receive them over a wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, CandidateRef, ChannelId, QueueType};
use crate::error::Result;
use crate::scheduler::{ActiveAssignment, QueueEntry};
use crate::service::commands::CooldownCheck;
use crate::service::RotationService;
use crate::state::{QueueView, Removal, StatusView};

/// The two actions attached to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Start,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Join {
        candidate: CandidateRef,
        joined_at: DateTime<Utc>,
        queue_type: QueueType,
        #[serde(default)]
        notes: String,
    },
    Leave {
        candidate: CandidateId,
    },
    AdminRemove {
        admin: CandidateRef,
        candidate: CandidateId,
    },
    Start {
        candidate: CandidateId,
    },
    ForceStart {
        admin: CandidateRef,
        candidate: CandidateId,
    },
    StartExtra {
        candidate: CandidateId,
        #[serde(default)]
        channel: Option<ChannelId>,
    },
    Respond {
        candidate: CandidateId,
        response: Response,
    },
    Finish {
        candidate: CandidateId,
        #[serde(default)]
        channel: Option<ChannelId>,
    },
    ForceFinish {
        admin: CandidateRef,
        candidate: CandidateId,
        #[serde(default)]
        channel: Option<ChannelId>,
    },
    SetPosition {
        admin: CandidateRef,
        candidate: CandidateId,
        slot: i64,
    },
    AddPlayer {
        admin: CandidateRef,
        candidate: CandidateRef,
        queue_type: QueueType,
        #[serde(default)]
        notes: Option<String>,
    },
    ReplacePartition {
        admin: CandidateRef,
        queue_type: QueueType,
        candidates: Vec<CandidateRef>,
    },
    AddCooldown {
        admin: CandidateRef,
        candidate: CandidateRef,
        hours: u32,
    },
    AdminClearCooldown {
        admin: CandidateRef,
        candidate: CandidateId,
    },
    SelfClearCooldown {
        candidate: CandidateId,
    },
    AdminClearSelfReleaseWindow {
        admin: CandidateRef,
        candidate: CandidateId,
    },
    GrantTenureException {
        admin: CandidateRef,
        candidate: CandidateRef,
    },
    Pause,
    Resume,
    Merge,
    Split,
    Save,
    Load,
    QueueView,
    ActiveList,
    CheckCooldown {
        candidate: CandidateId,
    },
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Queued(QueueEntry),
    Removed(Removal),
    Started(ActiveAssignment),
    Finished(ActiveAssignment),
    Position(u32),
    Replaced(usize),
    CooldownUntil(DateTime<Utc>),
    /// Mode switch; false if the queue was already in that mode.
    ModeChanged(bool),
    Queue(QueueView),
    Active(Vec<ActiveAssignment>),
    Cooldown(CooldownCheck),
    Status(StatusView),
}

impl RotationService {
    pub async fn execute(&self, command: Command) -> Result<Outcome> {
        let outcome = match command {
            Command::Join {
                candidate,
                joined_at,
                queue_type,
                notes,
            } => Outcome::Queued(self.join(candidate, joined_at, queue_type, &notes).await?),
            Command::Leave { candidate } => Outcome::Removed(self.leave(candidate).await?),
            Command::AdminRemove { admin, candidate } => {
                Outcome::Removed(self.admin_remove(&admin, candidate).await?)
            }
            Command::Start { candidate } => Outcome::Started(self.start(candidate).await?),
            Command::ForceStart { admin, candidate } => {
                Outcome::Started(self.force_start(&admin, candidate).await?)
            }
            Command::StartExtra { candidate, channel } => {
                Outcome::Started(self.start_extra(candidate, channel).await?)
            }
            Command::Respond {
                candidate,
                response,
            } => self.respond(candidate, response).await?,
            Command::Finish { candidate, channel } => {
                Outcome::Finished(self.finish(candidate, channel).await?)
            }
            Command::ForceFinish {
                admin,
                candidate,
                channel,
            } => Outcome::Finished(self.force_finish(&admin, candidate, channel).await?),
            Command::SetPosition {
                admin,
                candidate,
                slot,
            } => Outcome::Position(self.set_position(&admin, candidate, slot).await?),
            Command::AddPlayer {
                admin,
                candidate,
                queue_type,
                notes,
            } => Outcome::Queued(
                self.add_player(&admin, candidate, queue_type, notes.as_deref())
                    .await?,
            ),
            Command::ReplacePartition {
                admin,
                queue_type,
                candidates,
            } => Outcome::Replaced(
                self.replace_partition(&admin, queue_type, candidates)
                    .await?,
            ),
            Command::AddCooldown {
                admin,
                candidate,
                hours,
            } => Outcome::CooldownUntil(self.add_cooldown(&admin, candidate, hours).await?),
            Command::AdminClearCooldown { admin, candidate } => {
                self.admin_clear_cooldown(&admin, candidate).await?;
                Outcome::Done
            }
            Command::SelfClearCooldown { candidate } => {
                Outcome::CooldownUntil(self.self_clear_cooldown(candidate).await?)
            }
            Command::AdminClearSelfReleaseWindow { admin, candidate } => {
                self.admin_clear_self_release_window(&admin, candidate)
                    .await?;
                Outcome::Done
            }
            Command::GrantTenureException { admin, candidate } => {
                self.grant_tenure_exception(&admin, candidate).await?;
                Outcome::Done
            }
            Command::Pause => {
                self.pause().await;
                Outcome::Done
            }
            Command::Resume => {
                self.resume().await;
                Outcome::Done
            }
            Command::Merge => Outcome::ModeChanged(self.merge().await),
            Command::Split => Outcome::ModeChanged(self.split().await),
            Command::Save => {
                self.save().await?;
                Outcome::Done
            }
            Command::Load => {
                self.load().await?;
                Outcome::Done
            }
            Command::QueueView => Outcome::Queue(self.queue_view().await),
            Command::ActiveList => Outcome::Active(self.active_list().await),
            Command::CheckCooldown { candidate } => {
                Outcome::Cooldown(self.check_cooldown(candidate).await)
            }
            Command::Status => Outcome::Status(self.status().await),
        };
        Ok(outcome)
    }
}
