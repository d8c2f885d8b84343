//! recordbook - validated record store for tasks, plans and contacts
//!
//! This library provides the core of the recordbook application: a
//! schema-driven record store that validates every record before it is
//! persisted, writes atomically, and keeps timestamped backups.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Record kinds, field types and records
//! - `validator`: Field rules applied before anything is stored
//! - `storage`: Record store and its JSON and CSV backends
//! - `query`: Field predicate and free-text search
//! - `backup`: Backup creation, retention and restore
//! - `export`: JSON and YAML export, JSON import
//! - `display`: Terminal tables and detail views
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use recordbook::config::{RecordbookPaths, Settings};
//! use recordbook::models::RecordKind;
//! use recordbook::storage::open_store;
//!
//! let paths = RecordbookPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let store = open_store(&paths, &settings, RecordKind::Todo)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod query;
pub mod storage;
pub mod validator;

pub use error::{RecordbookError, RecordbookResult};
pub use models::{Record, RecordId, RecordKind, Schema};
pub use query::{Query, QueryEngine};
pub use storage::RecordStore;
pub use validator::{ValidationError, Validator};
