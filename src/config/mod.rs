//! Configuration module for recordbook
//!
//! This module provides configuration management including:
//! - Base directory resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::RecordbookPaths;
pub use settings::{BackupRetention, Settings};
