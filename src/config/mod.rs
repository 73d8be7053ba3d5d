//! Configuration Module
//!
//! Loads and validates the process configuration from TOML files.

pub mod loader;

pub use loader::{load_config, Config, ConfigError};
