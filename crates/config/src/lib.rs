//! `vmaster-config` — settings for the vendor-master cycle.
//!
//! One TOML file, loaded once, passed into components by value.

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{Settings, CONFIG_ENV, GRC_TOKEN_ENV, STORAGE_TOKEN_ENV};
