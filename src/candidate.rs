use serde::{Deserialize, Serialize};

/// Opaque platform identifier of a candidate (a chat-platform user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u64);

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CandidateId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Platform channel that receives announcements for a partition.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display data for a candidate, copied at write time rather than looked up live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub id: CandidateId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl CandidateRef {
    pub fn new(id: impl Into<CandidateId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: String::new(),
        }
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = avatar_url.into();
        self
    }
}

/// Which rotation a queue entry waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueType {
    Beginner,
    Pickup,
    Any,
}

impl std::fmt::Display for QueueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueType::Beginner => write!(f, "Beginner"),
            QueueType::Pickup => write!(f, "Pickup"),
            QueueType::Any => write!(f, "Any"),
        }
    }
}

/// Type of a held turn. `Extra` turns run outside the normal rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentType {
    Beginner,
    Pickup,
    Any,
    Extra,
}

impl From<QueueType> for AssignmentType {
    fn from(queue_type: QueueType) -> Self {
        match queue_type {
            QueueType::Beginner => AssignmentType::Beginner,
            QueueType::Pickup => AssignmentType::Pickup,
            QueueType::Any => AssignmentType::Any,
        }
    }
}

impl std::fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentType::Beginner => write!(f, "Beginner"),
            AssignmentType::Pickup => write!(f, "Pickup"),
            AssignmentType::Any => write!(f, "Any"),
            AssignmentType::Extra => write!(f, "Extra"),
        }
    }
}
