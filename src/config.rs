use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidate::{AssignmentType, ChannelId, QueueType};
use crate::error::Result;

/// Timing contract of the rotation. All values are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long an invited candidate has to respond.
    pub response_window_secs: u64,
    /// Number of equal poll steps the response window is divided into.
    pub poll_steps: u32,
    /// Interval of the periodic evaluation pass.
    pub evaluation_interval_secs: u64,
    /// Cooldown applied after a turn is taken.
    pub join_cooldown_secs: u64,
    /// Cooldown applied on leave, admin removal and auto-skip.
    pub leave_cooldown_secs: u64,
    /// Throttle window written when a candidate clears their own cooldown.
    pub self_release_window_secs: u64,
    /// Delay of the one-shot re-rack reminder after a turn starts.
    pub rerack_reminder_secs: u64,
    /// Minimum membership age before joining.
    pub tenure_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            response_window_secs: 300,
            poll_steps: 100,
            evaluation_interval_secs: 10,
            join_cooldown_secs: 144_000,
            leave_cooldown_secs: 3_600,
            self_release_window_secs: 5_184_000,
            rerack_reminder_secs: 2_400,
            tenure_secs: 14 * 24 * 3_600,
        }
    }
}

impl TimingConfig {
    pub fn response_window(&self) -> chrono::Duration {
        secs(self.response_window_secs)
    }

    /// Sleep between two observations of a pending invitation.
    pub fn poll_step(&self) -> Duration {
        Duration::from_secs(self.response_window_secs) / self.poll_steps.max(1)
    }

    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_secs(self.evaluation_interval_secs.max(1))
    }

    pub fn join_cooldown(&self) -> chrono::Duration {
        secs(self.join_cooldown_secs)
    }

    pub fn leave_cooldown(&self) -> chrono::Duration {
        secs(self.leave_cooldown_secs)
    }

    pub fn self_release_window(&self) -> chrono::Duration {
        secs(self.self_release_window_secs)
    }

    pub fn rerack_reminder(&self) -> Duration {
        Duration::from_secs(self.rerack_reminder_secs)
    }

    pub fn tenure(&self) -> chrono::Duration {
        secs(self.tenure_secs)
    }
}

/// Upper bound for any configured timing, roughly a century.
pub const MAX_TIMING_SECS: u64 = 100 * 365 * 24 * 3_600;

/// Timings beyond [`MAX_TIMING_SECS`] are clamped so date arithmetic stays in range.
fn secs(value: u64) -> chrono::Duration {
    let clamped = value.min(MAX_TIMING_SECS) as i64;
    chrono::Duration::seconds(clamped)
}

/// Where each partition's announcements go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelBindings {
    pub beginner: ChannelId,
    pub pickup: ChannelId,
    pub merged: ChannelId,
}

impl ChannelBindings {
    /// Merged announcements start out on the pickup channel.
    pub fn new(beginner: ChannelId, pickup: ChannelId) -> Self {
        Self {
            beginner,
            pickup,
            merged: pickup,
        }
    }

    /// Channel for announcements about an entry of `queue_type`.
    pub fn for_queue_type(&self, queue_type: QueueType) -> ChannelId {
        match queue_type {
            QueueType::Beginner => self.beginner,
            QueueType::Pickup => self.pickup,
            QueueType::Any => self.merged,
        }
    }

    pub fn for_assignment(&self, assignment_type: AssignmentType) -> ChannelId {
        match assignment_type {
            AssignmentType::Beginner => self.beginner,
            AssignmentType::Pickup => self.pickup,
            AssignmentType::Any | AssignmentType::Extra => self.merged,
        }
    }

    /// Follow a finished turn to the channel it was finished from.
    pub fn rebind(&mut self, finished: AssignmentType, channel: ChannelId) {
        match finished {
            AssignmentType::Beginner => {
                self.beginner = channel;
                self.merged = channel;
            }
            AssignmentType::Pickup => {
                self.pickup = channel;
                self.merged = channel;
            }
            AssignmentType::Any | AssignmentType::Extra => {}
        }
    }
}

/// Snapshot storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the four JSON documents.
    pub data_dir: PathBuf,
    /// Keep state in memory only.
    pub ephemeral: bool,
    /// Save a full snapshot after every successful command.
    pub persist_on_mutation: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ephemeral: false,
            persist_on_mutation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub timing: TimingConfig,
    pub storage: StorageConfig,
    pub channels: ChannelBindings,
    /// Start with a single merged queue rather than split Beginner/Pickup queues.
    pub start_merged: bool,
    /// Start with games running instead of paused.
    pub start_running: bool,
    /// Concrete type written onto a candidate invited from the merged queue.
    pub merged_queue_type: QueueType,
    /// Bind address of the HTTP command surface, if any.
    pub http_addr: Option<SocketAddr>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            storage: StorageConfig::default(),
            channels: ChannelBindings::default(),
            start_merged: true,
            start_running: false,
            merged_queue_type: QueueType::Pickup,
            http_addr: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_channels(mut self, channels: ChannelBindings) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = data_dir.into();
        self
    }

    pub fn running(mut self, running: bool) -> Self {
        self.start_running = running;
        self
    }

    pub fn merged(mut self, merged: bool) -> Self {
        self.start_merged = merged;
        self
    }
}
