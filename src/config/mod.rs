//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ratelimit_gate::config::Settings;
//!
//! let settings = Settings::load()?;
//! let window = settings.rate_limit.window()?;
//! println!("{} requests per {}s", window.capacity(), window.duration_secs());
//! ```

mod settings;

pub use settings::*;
