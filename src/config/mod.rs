//! Configuration module
//!
//! TOML-backed settings for the backend connection, display,
//! history, and the local result cache.

pub mod config;
