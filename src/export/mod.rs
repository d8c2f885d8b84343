//! Export module for recordbook
//!
//! Provides record export and import:
//! - JSON: machine-readable flat records, also the import format
//! - YAML: human-readable export

pub mod json;
pub mod yaml;

pub use json::{export_json, export_json_to_path, import_json, parse_import_json};
pub use yaml::{export_yaml, export_yaml_to_path};
