pub mod active;
pub mod cooldown;
pub mod eligibility;
pub mod exceptions;
pub mod partition;
pub mod pending;
pub mod queue;
pub mod turn;

pub use active::{ActiveAssignment, ActiveAssignmentTracker};
pub use cooldown::{CooldownEntry, CooldownStore};
pub use eligibility::{Admission, EligibilityGate};
pub use exceptions::{ExceptionEntry, ExceptionRegistry};
pub use partition::{Mode, Partition, RotationSettings};
pub use pending::{Invitation, PendingInvitations};
pub use queue::{QueueEntry, QueueStore};
pub use turn::{evaluate, expire, observe, AbandonReason, Expiry, TurnOffer, WaitStatus};
