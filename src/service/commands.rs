use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateId, CandidateRef, ChannelId, QueueType};
use crate::error::{Result, RotaError};
use crate::notify::{Announcement, Notice};
use crate::scheduler::{ActiveAssignment, Mode, QueueEntry};
use crate::service::{Outcome, Response, RotationService};
use crate::state::{QueueView, Removal, RotaState, StatusView};

/// Answer to a cooldown lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownCheck {
    pub candidate: CandidateId,
    /// End of a cooldown still running, if any.
    pub cooldown_until: Option<DateTime<Utc>>,
    pub self_release_until: Option<DateTime<Utc>>,
}

fn removal_notice(state: &RotaState, removal: &Removal, admin: bool) -> Notice {
    let channel = state
        .settings
        .channels
        .for_queue_type(removal.entry.queue_type);
    let candidate = removal.entry.candidate.clone();
    let cooldown_until = removal.cooldown_until;
    let announcement = if admin {
        Announcement::Removed {
            candidate,
            cooldown_until,
        }
    } else {
        Announcement::Left {
            candidate,
            cooldown_until,
        }
    };
    Notice::new(channel, announcement)
}

fn started_notice(state: &RotaState, assignment: &ActiveAssignment) -> Notice {
    Notice::new(
        state
            .settings
            .channels
            .for_assignment(assignment.assignment_type),
        Announcement::Started {
            candidate: assignment.candidate.clone(),
            assignment_type: assignment.assignment_type,
        },
    )
}

impl RotationService {
    pub async fn join(
        &self,
        candidate: CandidateRef,
        joined_at: DateTime<Utc>,
        queue_type: QueueType,
        notes: &str,
    ) -> Result<QueueEntry> {
        self.mutate(|state, timing, now| {
            let entry = state.join(&candidate, joined_at, queue_type, notes, timing, now)?;
            tracing::info!(candidate = %entry.id(), position = entry.position, queue_type = %queue_type, "Joined queue");
            Ok((entry, Vec::new()))
        })
        .await
    }

    pub async fn leave(&self, id: CandidateId) -> Result<Removal> {
        self.mutate(|state, timing, now| {
            let removal = state.leave(id, timing, now)?;
            let notice = removal_notice(state, &removal, false);
            Ok((removal, vec![notice]))
        })
        .await
    }

    pub async fn admin_remove(&self, admin: &CandidateRef, id: CandidateId) -> Result<Removal> {
        self.mutate(|state, timing, now| {
            let removal = state.leave(id, timing, now)?;
            tracing::info!(admin = %admin.id, candidate = %id, "Removed from queue by admin");
            let notice = removal_notice(state, &removal, true);
            Ok((removal, vec![notice]))
        })
        .await
    }

    /// Take the turn and schedule the re-rack reminder on the started channel.
    pub async fn start(&self, id: CandidateId) -> Result<ActiveAssignment> {
        let (assignment, channel) = self
            .mutate(|state, timing, now| {
                let assignment = state.promote(id, timing, now)?;
                let notice = started_notice(state, &assignment);
                Ok(((assignment, notice.channel), vec![notice]))
            })
            .await?;
        self.spawn_rerack_reminder(assignment.candidate.clone(), channel);
        Ok(assignment)
    }

    pub async fn force_start(&self, admin: &CandidateRef, id: CandidateId) -> Result<ActiveAssignment> {
        tracing::info!(admin = %admin.id, candidate = %id, "Force start");
        self.start(id).await
    }

    /// Start an extra game and schedule its re-rack reminder. The reminder goes
    /// to `channel`, or the merged channel when none is given.
    pub async fn start_extra(
        &self,
        id: CandidateId,
        channel: Option<ChannelId>,
    ) -> Result<ActiveAssignment> {
        let (assignment, channel) = self
            .mutate(|state, timing, now| {
                let assignment = state.start_extra(id, timing, now)?;
                let channel = channel.unwrap_or(state.settings.channels.merged);
                let notice = Notice::new(
                    channel,
                    Announcement::Started {
                        candidate: assignment.candidate.clone(),
                        assignment_type: assignment.assignment_type,
                    },
                );
                Ok(((assignment, channel), vec![notice]))
            })
            .await?;
        self.spawn_rerack_reminder(assignment.candidate.clone(), channel);
        Ok(assignment)
    }

    /// Resolve a Start/Leave button press against the candidate's pending invitation.
    pub async fn respond(&self, id: CandidateId, response: Response) -> Result<Outcome> {
        let (outcome, started_on) = self
            .mutate(|state, timing, now| {
                if state.pending.find_by_candidate(id).is_none() || !state.queue.contains(id) {
                    return Err(RotaError::NotInvited(id));
                }
                match response {
                    Response::Start => {
                        let assignment = state.promote(id, timing, now)?;
                        let notice = started_notice(state, &assignment);
                        let channel = notice.channel;
                        Ok(((Outcome::Started(assignment), Some(channel)), vec![notice]))
                    }
                    Response::Leave => {
                        let removal = state.leave(id, timing, now)?;
                        let notice = removal_notice(state, &removal, false);
                        Ok(((Outcome::Removed(removal), None), vec![notice]))
                    }
                }
            })
            .await?;
        if let (Outcome::Started(assignment), Some(channel)) = (&outcome, started_on) {
            self.spawn_rerack_reminder(assignment.candidate.clone(), channel);
        }
        Ok(outcome)
    }

    pub async fn finish(&self, id: CandidateId, channel: Option<ChannelId>) -> Result<ActiveAssignment> {
        self.release(id, channel, false).await
    }

    pub async fn force_finish(
        &self,
        admin: &CandidateRef,
        id: CandidateId,
        channel: Option<ChannelId>,
    ) -> Result<ActiveAssignment> {
        tracing::info!(admin = %admin.id, candidate = %id, "Force finish");
        self.release(id, channel, true).await
    }

    async fn release(
        &self,
        id: CandidateId,
        channel: Option<ChannelId>,
        forced: bool,
    ) -> Result<ActiveAssignment> {
        let released = self
            .mutate(|state, _, _| {
                let released = state.finish(id, channel)?;
                let to = channel.unwrap_or_else(|| {
                    state
                        .settings
                        .channels
                        .for_assignment(released.assignment_type)
                });
                let notice = Notice::new(
                    to,
                    Announcement::Finished {
                        candidate: released.candidate.clone(),
                        forced,
                    },
                );
                Ok((released, vec![notice]))
            })
            .await?;
        self.wake();
        Ok(released)
    }

    pub async fn set_position(&self, admin: &CandidateRef, id: CandidateId, slot: i64) -> Result<u32> {
        self.mutate(|state, _, _| {
            let rank = state.set_position(id, slot)?;
            tracing::info!(admin = %admin.id, candidate = %id, rank, "Queue position set");
            Ok((rank, Vec::new()))
        })
        .await
    }

    pub async fn add_player(
        &self,
        admin: &CandidateRef,
        candidate: CandidateRef,
        queue_type: QueueType,
        notes: Option<&str>,
    ) -> Result<QueueEntry> {
        self.mutate(|state, _, _| {
            let entry = state.add_player(candidate, queue_type, notes)?;
            tracing::info!(admin = %admin.id, candidate = %entry.id(), position = entry.position, "Player added by admin");
            Ok((entry, Vec::new()))
        })
        .await
    }

    pub async fn replace_partition(
        &self,
        admin: &CandidateRef,
        queue_type: QueueType,
        candidates: Vec<CandidateRef>,
    ) -> Result<usize> {
        self.mutate(|state, _, _| {
            let count = state.replace_partition(queue_type, candidates)?;
            tracing::info!(admin = %admin.id, queue_type = %queue_type, count, "Partition replaced");
            Ok((count, Vec::new()))
        })
        .await
    }

    pub async fn add_cooldown(
        &self,
        admin: &CandidateRef,
        candidate: CandidateRef,
        hours: u32,
    ) -> Result<DateTime<Utc>> {
        self.mutate(|state, _, now| {
            let until = state.add_cooldown(&candidate, hours, now)?;
            tracing::info!(admin = %admin.id, candidate = %candidate.id, until = %until, "Cooldown added");
            Ok((until, Vec::new()))
        })
        .await
    }

    pub async fn admin_clear_cooldown(&self, admin: &CandidateRef, id: CandidateId) -> Result<()> {
        self.mutate(|state, _, now| {
            state.admin_clear_cooldown(id, now)?;
            tracing::info!(admin = %admin.id, candidate = %id, "Cooldown cleared by admin");
            Ok(((), Vec::new()))
        })
        .await
    }

    /// Returns the end of the throttle window that was opened.
    pub async fn self_clear_cooldown(&self, id: CandidateId) -> Result<DateTime<Utc>> {
        self.mutate(|state, timing, now| {
            let window = state.self_clear_cooldown(id, timing, now)?;
            Ok((window, Vec::new()))
        })
        .await
    }

    pub async fn admin_clear_self_release_window(
        &self,
        admin: &CandidateRef,
        id: CandidateId,
    ) -> Result<()> {
        self.mutate(|state, _, now| {
            state.admin_clear_self_release_window(id, now)?;
            tracing::info!(admin = %admin.id, candidate = %id, "Self-release window cleared");
            Ok(((), Vec::new()))
        })
        .await
    }

    pub async fn grant_tenure_exception(&self, admin: &CandidateRef, candidate: CandidateRef) -> Result<()> {
        let admin = admin.clone();
        self.mutate(move |state, _, _| {
            state.grant_exception(candidate, admin);
            Ok(((), Vec::new()))
        })
        .await
    }

    pub async fn pause(&self) {
        self.state.lock().await.settings.pause();
        tracing::info!("Games paused");
    }

    pub async fn resume(&self) {
        self.state.lock().await.settings.resume();
        tracing::info!("Games resumed");
        self.wake();
    }

    pub async fn merge(&self) -> bool {
        self.set_mode(Mode::Merged).await
    }

    pub async fn split(&self) -> bool {
        self.set_mode(Mode::Split).await
    }

    async fn set_mode(&self, mode: Mode) -> bool {
        let changed = self.state.lock().await.settings.set_mode(mode);
        if changed {
            tracing::info!(mode = %mode, "Queue mode changed");
            self.wake();
        }
        changed
    }

    /// Write the current stores out, regardless of the persist-on-mutation setting.
    pub async fn save(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.persistence.save(&state.snapshot()).await
    }

    pub async fn load(&self) -> Result<()> {
        self.restore().await?;
        self.wake();
        Ok(())
    }

    pub async fn queue_view(&self) -> QueueView {
        self.state.lock().await.queue_view()
    }

    pub async fn active_list(&self) -> Vec<ActiveAssignment> {
        self.state.lock().await.active.assignments().cloned().collect()
    }

    /// A candidate the rota has never seen is simply not on cooldown.
    pub async fn check_cooldown(&self, id: CandidateId) -> CooldownCheck {
        let state = self.state.lock().await;
        let now = self.now();
        CooldownCheck {
            candidate: id,
            cooldown_until: state.cooldowns.cooldown_until(id, now),
            self_release_until: state
                .cooldowns
                .get(id)
                .and_then(|entry| entry.self_release_until)
                .filter(|until| *until > now),
        }
    }

    pub async fn status(&self) -> StatusView {
        self.state.lock().await.status()
    }
}
