pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BotError, Result};
pub use types::{Capability, CommandCategory, MessageRecord, Principal};
