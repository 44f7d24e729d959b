pub mod admission;
pub mod plane;

pub use admission::{AdmissionOutcome, QueueAdmission, SqliteQueueAdmission};
pub use plane::{ControlPlane, HttpControlPlane, RestartOutcome};
