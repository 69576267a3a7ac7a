pub mod actor;
pub mod clock;
pub mod error;

pub use actor::Actor;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AppError, Result, TransitionError};
