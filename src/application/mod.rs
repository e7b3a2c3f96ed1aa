//! Application Layer
//!
//! Contains the sliding window limiter that turns store state into grant
//! decisions.

pub mod services;
