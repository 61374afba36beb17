pub mod coordinator;
pub mod events;
pub mod fanout;
pub mod selector;

pub use coordinator::{DispatchCoordinator, DispatchOutcome, MissionSnapshot, MissionView};
pub use events::DispatchEvent;
pub use fanout::{EventFanout, Subscription};
pub use selector::{select_nearest, Selection};
