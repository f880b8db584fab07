//! # ap-core
//!
//! Core types and configuration for Attachment Preview.
//!
//! This crate provides the building blocks shared by the other crates:
//! - Configuration loading (`AppConfig`, `ConfigError`)
//! - The owning-record reference (`RecordRef`)
//! - File size helpers

pub mod config;
pub mod types;

pub use config::{AppConfig, ConfigError, ControlConfig, RecordConfig, WebApiConfig};
pub use types::*;
