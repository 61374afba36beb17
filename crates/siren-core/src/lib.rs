pub mod domain;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod time;

pub use domain::{Incident, IncidentStatus, Unit};
pub use error::{DispatchError, DispatchResult, ErrorCode};
pub use ids::{IncidentId, SubscriberId, UnitCode};
pub use lifecycle::Transition;
pub use time::{now_epoch_millis, EpochMillis};
