//! Domain Layer
//!
//! Window configuration, grant decisions, and the traits the rest of the
//! crate is written against.

pub mod clock;
pub mod limiter;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{Limiter, WindowStore, WindowUpdate};
pub use window::{GrantResult, WindowConfig, DEFAULT_CAPACITY, DEFAULT_WINDOW};
