pub mod clock;
pub mod config;
pub mod cooldown;
pub mod errors;
pub mod office_hours;
pub mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::CooldownGate;
pub use errors::DomainError;
pub use office_hours::OfficeHours;
pub use policy::{ConversationKeySource, MessageKind, RespondPolicy};
