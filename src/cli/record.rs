//! Record CLI commands
//!
//! Implements the create/read/update/delete, list and search commands.

use clap::Subcommand;

use crate::display::record::{format_record_details, format_record_list};
use crate::error::RecordbookResult;
use crate::models::{RawFields, RecordId};
use crate::query::{Query, QueryEngine};
use crate::storage::RecordStore;
use crate::validator::{ValidationError, ValidationRule};

/// Parse a `KEY=VALUE` argument
pub fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}

/// Collect `KEY=VALUE` arguments, rejecting a key given twice
fn to_fields(assignments: Vec<(String, String)>) -> RecordbookResult<RawFields> {
    let mut fields = RawFields::new();
    for (key, value) in assignments {
        if fields.contains_key(&key) {
            return Err(ValidationError::new(key, ValidationRule::Repeated).into());
        }
        fields.insert(key, value);
    }
    Ok(fields)
}

/// Record subcommands
#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Add a record: `add title="Pay bills" priority=high`
    Add {
        /// Field values as KEY=VALUE
        #[arg(required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Show one record
    Show {
        /// Record ID (`3` or `#3`)
        id: RecordId,
    },

    /// Change fields of a record; an empty value clears the field
    #[command(alias = "edit")]
    Update {
        /// Record ID (`3` or `#3`)
        id: RecordId,
        /// Field values as KEY=VALUE
        #[arg(required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        /// Record ID (`3` or `#3`)
        id: RecordId,
    },

    /// List all records
    #[command(alias = "ls")]
    List,

    /// Search records: `field=value`, `field~text`, `field:FROM..TO`
    Search {
        /// Predicates, all of which must match
        predicates: Vec<String>,
        /// Match text in any free-text field
        #[arg(short, long)]
        text: Option<String>,
    },
}

impl RecordCommands {
    /// Whether the command changes stored data
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Add { .. } | Self::Update { .. } | Self::Delete { .. }
        )
    }
}

/// Handle a record command
pub fn handle_record_command(store: &RecordStore, cmd: RecordCommands) -> RecordbookResult<()> {
    let schema = store.schema();
    let entity = schema.kind().entity_name();

    match cmd {
        RecordCommands::Add { fields } => {
            let record = store.create(&to_fields(fields)?)?;
            println!("Created {} {}", entity.to_lowercase(), record);
        }

        RecordCommands::Show { id } => {
            let record = store.read(id)?;
            print!("{}", format_record_details(schema, &record));
        }

        RecordCommands::Update { id, fields } => {
            let record = store.update(id, &to_fields(fields)?)?;
            println!("Updated {} {}", entity.to_lowercase(), record);
        }

        RecordCommands::Delete { id } => {
            let record = store.delete(id)?;
            println!("Deleted {} {}", entity.to_lowercase(), record);
        }

        RecordCommands::List => {
            let records = store.list()?;
            println!("{}", format_record_list(schema, &records));
        }

        RecordCommands::Search { predicates, text } => {
            let engine = QueryEngine::new(store);
            let query = Query::parse(&predicates)?;

            let mut records = engine.search(&query)?;
            if let Some(term) = text {
                let text_ids: Vec<RecordId> = engine
                    .search_text(&term)?
                    .into_iter()
                    .map(|r| r.id)
                    .collect();
                records.retain(|r| text_ids.contains(&r.id));
            }

            println!("{}", format_record_list(schema, &records));
        }
    }

    Ok(())
}
