//! CLI command handler for JSON import
//!
//! Imports a JSON array of flat records into the current kind. Entries that
//! fail validation are skipped and reported unless strict mode is on.

use std::path::Path;

use crate::display::backup::format_import_report;
use crate::error::{RecordbookError, RecordbookResult};
use crate::export::import_json;
use crate::storage::RecordStore;

/// Handle the import command
pub fn handle_import_command(store: &RecordStore, file: &Path, strict: bool) -> RecordbookResult<()> {
    if !file.exists() {
        return Err(RecordbookError::Import(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let report = import_json(store, file, strict)?;
    println!("{}", format_import_report(&report));

    Ok(())
}
