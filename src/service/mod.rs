//! The rotation service: one locked [`RotaState`], the evaluation loop, and
//! the per-invitation watchers.
//!
//! Every command and every scheduler decision takes the state lock, so each
//! sees a consistent view and mutations are serialized. Outbound
//! notifications are always sent after the lock is released.

pub mod command;
mod commands;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::candidate::{CandidateRef, ChannelId};
use crate::clock::{Clock, SystemClock};
use crate::config::{ServiceConfig, TimingConfig};
use crate::error::Result;
use crate::notify::{Announcement, NotificationPort, Notice, TracingNotifier};
use crate::persistence::{JsonFilePersistence, MemoryPersistence, PersistencePort, Snapshot};
use crate::scheduler::{self, Expiry, Invitation, RotationSettings, TurnOffer, WaitStatus};
use crate::state::RotaState;

pub use command::{Command, Outcome, Response};
pub use commands::CooldownCheck;

#[derive(Clone)]
pub struct RotationService {
    config: Arc<ServiceConfig>,
    state: Arc<Mutex<RotaState>>,
    notifier: Arc<dyn NotificationPort>,
    persistence: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    wake: Arc<Notify>,
}

impl RotationService {
    pub fn new(
        config: ServiceConfig,
        notifier: Arc<dyn NotificationPort>,
        persistence: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = RotaState::new(RotationSettings::from_config(&config));
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
            notifier,
            persistence,
            clock,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Build the service with the shipped adapters and restore the last snapshot.
    ///
    /// Ephemeral configs keep state in memory; otherwise the JSON documents in
    /// the configured data directory are used.
    pub async fn open(config: ServiceConfig) -> Result<Self> {
        let persistence: Arc<dyn PersistencePort> = if config.storage.ephemeral {
            Arc::new(MemoryPersistence::new())
        } else {
            Arc::new(JsonFilePersistence::new(config.storage.data_dir.clone()))
        };
        let service = Self::new(
            config,
            Arc::new(TracingNotifier),
            persistence,
            Arc::new(SystemClock),
        );
        service.restore().await?;
        Ok(service)
    }

    /// Replace the stores with the persisted snapshot.
    pub async fn restore(&self) -> Result<()> {
        let snapshot = self.persistence.load().await?;
        self.state.lock().await.restore(snapshot);
        Ok(())
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn timing(&self) -> &TimingConfig {
        &self.config.timing
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Poke the evaluation loop so it runs a pass now instead of at the next tick.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Run the evaluation loop until `shutdown` is cancelled.
    ///
    /// A pass runs on every interval tick and whenever [`wake`](Self::wake) is
    /// called. Watchers and reminders spawned by a pass are not awaited on exit.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.timing().evaluation_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.timing().evaluation_interval_secs,
            "Rotation loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Rotation loop shutting down");
                    break;
                }
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
            }
            self.evaluation_pass().await;
        }
    }

    /// One evaluation pass: publish offers under the lock, then notify and
    /// start a watcher for each.
    pub async fn evaluation_pass(&self) -> Vec<TurnOffer> {
        let offers = {
            let mut state = self.state.lock().await;
            let offers = scheduler::evaluate(&mut state, self.timing(), self.now());
            if !offers.is_empty() {
                self.persist_best_effort(&state.snapshot()).await;
            }
            offers
        };

        for offer in &offers {
            self.deliver_offer(offer).await;
            self.spawn_watcher(offer.invitation.clone());
        }
        offers
    }

    async fn deliver_offer(&self, offer: &TurnOffer) {
        let invitation = &offer.invitation;
        if let Err(e) = self.notifier.invite(invitation).await {
            tracing::warn!(invitation_id = %invitation.id, error = %e, "Failed to send invitation");
        }
        let sent = match &offer.second_in_line {
            Some(next) => {
                self.notifier
                    .inform_second_in_line(invitation.channel, next, invitation.partition)
                    .await
            }
            None => {
                self.notifier
                    .announce(invitation.channel, &Announcement::NobodyBehind)
                    .await
            }
        };
        if let Err(e) = sent {
            tracing::warn!(partition = %invitation.partition, error = %e, "Failed to notify queue");
        }
    }

    fn spawn_watcher(&self, invitation: Invitation) {
        let service = self.clone();
        tokio::spawn(async move {
            service.watch(invitation).await;
        });
    }

    /// Poll an invitation in `poll_steps` equal steps, then close it out.
    async fn watch(&self, invitation: Invitation) {
        let step = self.timing().poll_step();
        for _ in 0..self.timing().poll_steps.max(1) {
            let status = {
                let state = self.state.lock().await;
                scheduler::observe(&state, &invitation)
            };
            if status == WaitStatus::Resolved {
                break;
            }
            tokio::time::sleep(step).await;
        }

        let expiry = {
            let mut state = self.state.lock().await;
            let expiry = scheduler::expire(&mut state, &invitation, self.timing(), self.now());
            if matches!(expiry, Expiry::Skipped { .. }) {
                self.persist_best_effort(&state.snapshot()).await;
            }
            expiry
        };

        match expiry {
            Expiry::Skipped { entry, .. } => {
                self.send(vec![Notice::new(
                    invitation.channel,
                    Announcement::Skipped {
                        candidate: entry.candidate,
                    },
                )])
                .await;
            }
            Expiry::Abandoned(reason) => {
                tracing::debug!(invitation_id = %invitation.id, reason = %reason, "Invitation abandoned");
            }
            Expiry::Resolved => {
                tracing::debug!(invitation_id = %invitation.id, "Invitation resolved");
            }
        }
        self.wake();
    }

    /// Fire the one-shot re-rack reminder for a started turn. No cancellation,
    /// no state check.
    fn spawn_rerack_reminder(&self, candidate: CandidateRef, channel: ChannelId) {
        let notifier = self.notifier.clone();
        let delay = self.timing().rerack_reminder();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let reminder = Announcement::ReRackExpired { candidate };
            if let Err(e) = notifier.announce(channel, &reminder).await {
                tracing::warn!(channel = %channel, error = %e, "Failed to send re-rack reminder");
            }
        });
    }

    /// Apply `op` to a copy of the state and commit it once the snapshot is saved.
    ///
    /// A rejected command or a failed save leaves the live state untouched.
    /// Notices returned by `op` are sent after the lock is released.
    async fn mutate<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut RotaState, &TimingConfig, DateTime<Utc>) -> Result<(T, Vec<Notice>)>,
    {
        let (value, notices) = {
            let mut live = self.state.lock().await;
            let mut next = live.clone();
            let (value, notices) = op(&mut next, self.timing(), self.now())?;
            if self.config.storage.persist_on_mutation {
                self.persistence.save(&next.snapshot()).await?;
            }
            *live = next;
            (value, notices)
        };
        self.send(notices).await;
        Ok(value)
    }

    async fn send(&self, notices: Vec<Notice>) {
        for notice in notices {
            if let Err(e) = self.notifier.announce(notice.channel, &notice.announcement).await {
                tracing::warn!(channel = %notice.channel, error = %e, "Failed to send announcement");
            }
        }
    }

    async fn persist_best_effort(&self, snapshot: &Snapshot) {
        if !self.config.storage.persist_on_mutation {
            return;
        }
        if let Err(e) = self.persistence.save(snapshot).await {
            tracing::warn!(error = %e, "Failed to persist rotation state");
        }
    }
}
