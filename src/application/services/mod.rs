//! Application Services
//!
//! Rate limiting services built on the domain traits.

pub mod sliding_window;

pub use sliding_window::{SlidingWindowLimiter, DEFAULT_KEY_EXPIRATION};
