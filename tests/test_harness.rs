//! Test harness for rotation service integration tests.
//!
//! Runs the service on a paused tokio clock with recording and in-memory
//! adapters, so a five minute response window passes in microseconds.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use turnkeeper::candidate::{CandidateId, CandidateRef, ChannelId, QueueType};
use turnkeeper::clock::TokioClock;
use turnkeeper::config::{ChannelBindings, ServiceConfig};
use turnkeeper::error::Result;
use turnkeeper::notify::{Announcement, NotificationPort};
use turnkeeper::persistence::{MemoryPersistence, PersistencePort, Snapshot};
use turnkeeper::scheduler::{Invitation, Partition};
use turnkeeper::service::RotationService;

pub const BEGINNER_CHANNEL: ChannelId = ChannelId(10);
pub const PICKUP_CHANNEL: ChannelId = ChannelId(20);

/// Wall time the test clock starts at.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 7, 19, 0, 0).unwrap()
}

/// A membership date old enough to pass the tenure check.
pub fn veteran() -> DateTime<Utc> {
    base_time() - chrono::Duration::days(90)
}

pub fn candidate(id: u64) -> CandidateRef {
    CandidateRef::new(id, format!("player{}", id))
}

pub fn admin() -> CandidateRef {
    CandidateRef::new(999u64, "moderator")
}

/// Running, in-memory config with a distinct channel per partition.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default()
        .running(true)
        .with_channels(ChannelBindings::new(BEGINNER_CHANNEL, PICKUP_CHANNEL));
    config.storage.ephemeral = true;
    config
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Invite(Invitation),
    SecondInLine {
        channel: ChannelId,
        candidate: CandidateId,
        partition: Partition,
    },
    Announce {
        channel: ChannelId,
        announcement: Announcement,
    },
}

/// Notifier that records everything it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn invites(&self) -> Vec<Invitation> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Invite(inv) => Some(inv),
                _ => None,
            })
            .collect()
    }

    pub fn announcements(&self) -> Vec<(ChannelId, Announcement)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Announce {
                    channel,
                    announcement,
                } => Some((channel, announcement)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<CandidateId> {
        self.announcements()
            .into_iter()
            .filter_map(|(_, a)| match a {
                Announcement::Skipped { candidate } => Some(candidate.id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn invite(&self, invitation: &Invitation) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Invite(invitation.clone()));
        Ok(())
    }

    async fn inform_second_in_line(
        &self,
        channel: ChannelId,
        candidate: &CandidateRef,
        partition: Partition,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::SecondInLine {
            channel,
            candidate: candidate.id,
            partition,
        });
        Ok(())
    }

    async fn announce(&self, channel: ChannelId, announcement: &Announcement) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Announce {
            channel,
            announcement: announcement.clone(),
        });
        Ok(())
    }
}

/// Persistence whose saves always fail.
#[derive(Debug, Default)]
pub struct FailingPersistence;

#[async_trait]
impl PersistencePort for FailingPersistence {
    async fn load(&self) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn save(&self, _snapshot: &Snapshot) -> Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
    }
}

/// Handle to a service under test.
pub struct TestRota {
    pub service: RotationService,
    pub notifier: Arc<RecordingNotifier>,
    #[allow(dead_code)]
    pub persistence: Arc<MemoryPersistence>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestRota {
    /// Build the service without starting its loop.
    pub fn new(config: ServiceConfig) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let persistence = Arc::new(MemoryPersistence::new());
        let service = RotationService::new(
            config,
            notifier.clone(),
            persistence.clone(),
            Arc::new(TokioClock::new(base_time())),
        );
        Self {
            service,
            notifier,
            persistence,
            shutdown: CancellationToken::new(),
            handle: None,
        }
    }

    /// Build and start the evaluation loop.
    pub fn start(config: ServiceConfig) -> Self {
        let mut rota = Self::new(config);
        rota.spawn_loop();
        rota
    }

    pub fn spawn_loop(&mut self) {
        let service = self.service.clone();
        let shutdown = self.shutdown.clone();
        self.handle = Some(tokio::spawn(async move {
            service.run(shutdown).await;
        }));
    }

    /// Join with a tenure old enough to pass.
    pub async fn join(&self, id: u64, queue_type: QueueType) {
        self.service
            .join(candidate(id), veteran(), queue_type, "")
            .await
            .unwrap();
    }

    /// Queued candidate ids. In merged mode this is rank order.
    pub async fn queued_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        for view in self.service.queue_view().await.partitions {
            for entry in view.entries {
                if !ids.contains(&entry.id().0) {
                    ids.push(entry.id().0);
                }
            }
        }
        ids
    }

    /// Wait until `count` invitations have been sent.
    pub async fn wait_for_invites(&self, count: usize, timeout: Duration) -> bool {
        let notifier = self.notifier.clone();
        wait_for(
            || {
                let notifier = notifier.clone();
                async move { notifier.invites().len() >= count }
            },
            timeout,
            Duration::from_millis(50),
        )
        .await
    }

    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// Poll until a condition becomes true or the timeout elapses (tokio time).
pub async fn wait_for<F, Fut>(condition: F, timeout_duration: Duration, poll_interval: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout_duration {
        if condition().await {
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
    false
}

/// Assert a condition eventually becomes true
#[allow(dead_code)]
pub async fn assert_eventually<F, Fut>(condition: F, timeout_duration: Duration, message: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = wait_for(condition, timeout_duration, Duration::from_millis(50)).await;
    assert!(result, "Condition not met within {:?}: {}", timeout_duration, message);
}
