pub mod clock;
pub mod error;
pub mod platform;
pub mod registry;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use error::{ModerationError, PlatformError};
pub use platform::{ChatPlatform, Notice, SerenityPlatform};
pub use registry::{MuteOutcome, MuteRegistry, RoleStep, UnmuteOutcome};
pub use scheduler::{ExpiryScheduler, SweepReport};
pub use store::{MuteStore, PgMuteStore};
