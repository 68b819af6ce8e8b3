use serde::{Deserialize, Serialize};

use crate::candidate::{AssignmentType, ChannelId, QueueType};
use crate::config::{ChannelBindings, ServiceConfig};
use crate::scheduler::queue::{QueueEntry, QueueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Merged,
    Split,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Merged => write!(f, "merged"),
            Mode::Split => write!(f, "split"),
        }
    }
}

/// An independently rotated slice of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Partition {
    Merged,
    Beginner,
    Pickup,
}

const MERGED_OCCUPANCY: &[AssignmentType] = &[
    AssignmentType::Beginner,
    AssignmentType::Pickup,
    AssignmentType::Any,
];
const BEGINNER_OCCUPANCY: &[AssignmentType] = &[AssignmentType::Beginner, AssignmentType::Any];
const PICKUP_OCCUPANCY: &[AssignmentType] = &[AssignmentType::Pickup, AssignmentType::Any];

impl Partition {
    /// Assignment types that keep this partition busy.
    pub fn occupancy_types(self) -> &'static [AssignmentType] {
        match self {
            Partition::Merged => MERGED_OCCUPANCY,
            Partition::Beginner => BEGINNER_OCCUPANCY,
            Partition::Pickup => PICKUP_OCCUPANCY,
        }
    }

    /// The merged partition shares its candidates with both split partitions.
    pub fn overlaps(self, other: Partition) -> bool {
        self == other || self == Partition::Merged || other == Partition::Merged
    }

    /// Concrete queue type written onto the candidate this partition invites.
    pub fn concrete_type(self, merged_queue_type: QueueType) -> QueueType {
        match self {
            Partition::Merged => merged_queue_type,
            Partition::Beginner => QueueType::Beginner,
            Partition::Pickup => QueueType::Pickup,
        }
    }

    /// Candidates this partition draws from, in rank order.
    pub fn view(self, queue: &QueueStore) -> Vec<&QueueEntry> {
        match self {
            Partition::Merged => queue.entries().iter().collect(),
            Partition::Beginner => queue.by_partition(QueueType::Beginner),
            Partition::Pickup => queue.by_partition(QueueType::Pickup),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Merged => write!(f, "Merged"),
            Partition::Beginner => write!(f, "Beginner"),
            Partition::Pickup => write!(f, "Pickup"),
        }
    }
}

/// Process-wide rotation switches. Owned by the service state and read by every
/// evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSettings {
    pub mode: Mode,
    /// Games running; the scheduler does nothing while paused.
    pub running: bool,
    pub merged_queue_type: QueueType,
    pub channels: ChannelBindings,
    /// Bumped on every actual merge/split change.
    pub mode_epoch: u64,
    /// Bumped on every pause.
    pub pause_epoch: u64,
}

impl RotationSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            mode: if config.start_merged {
                Mode::Merged
            } else {
                Mode::Split
            },
            running: config.start_running,
            merged_queue_type: config.merged_queue_type,
            channels: config.channels,
            mode_epoch: 0,
            pause_epoch: 0,
        }
    }

    pub fn partitions(&self) -> &'static [Partition] {
        match self.mode {
            Mode::Merged => &[Partition::Merged],
            Mode::Split => &[Partition::Beginner, Partition::Pickup],
        }
    }

    /// Switch mode. Returns true if the mode actually changed.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.mode_epoch += 1;
        true
    }

    pub fn pause(&mut self) {
        self.running = false;
        self.pause_epoch += 1;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    pub fn channel_for(&self, partition: Partition) -> ChannelId {
        match partition {
            Partition::Merged => self.channels.merged,
            Partition::Beginner => self.channels.beginner,
            Partition::Pickup => self.channels.pickup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_follow_mode() {
        let mut settings = RotationSettings::from_config(&ServiceConfig::default());
        assert_eq!(settings.partitions(), &[Partition::Merged]);
        assert!(settings.set_mode(Mode::Split));
        assert_eq!(settings.partitions(), &[Partition::Beginner, Partition::Pickup]);
        assert_eq!(settings.mode_epoch, 1);
        assert!(!settings.set_mode(Mode::Split));
        assert_eq!(settings.mode_epoch, 1);
    }

    #[test]
    fn pause_bumps_epoch_resume_does_not() {
        let mut settings = RotationSettings::from_config(&ServiceConfig::default().running(true));
        settings.pause();
        assert!(!settings.running);
        settings.resume();
        assert!(settings.running);
        assert_eq!(settings.pause_epoch, 1);
    }

    #[test]
    fn merged_overlaps_everything() {
        assert!(Partition::Merged.overlaps(Partition::Beginner));
        assert!(Partition::Pickup.overlaps(Partition::Merged));
        assert!(!Partition::Beginner.overlaps(Partition::Pickup));
    }

    #[test]
    fn merged_occupancy_ignores_extra() {
        assert!(!Partition::Merged
            .occupancy_types()
            .contains(&AssignmentType::Extra));
        assert!(Partition::Beginner
            .occupancy_types()
            .contains(&AssignmentType::Any));
    }
}
