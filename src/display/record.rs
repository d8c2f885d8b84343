//! Record display formatting
//!
//! Formats records for terminal output in table and detail views.

use chrono::{Local, NaiveDate};
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::models::{Record, Schema};

/// Column heading for a field name: `due_date` becomes `Due Date`
pub fn field_heading(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format records as a table with one column per schema field
pub fn format_record_list(schema: &Schema, records: &[Record]) -> String {
    format_record_list_as_of(schema, records, Local::now().date_naive())
}

/// Same as [`format_record_list`] with a fixed notion of today
pub fn format_record_list_as_of(schema: &Schema, records: &[Record], today: NaiveDate) -> String {
    if records.is_empty() {
        return format!("No {} records found.", schema.kind());
    }

    let mut builder = Builder::default();

    let mut header = vec!["ID".to_string()];
    header.extend(schema.field_names().into_iter().map(field_heading));
    builder.push_record(header);

    for record in records {
        let mut row = vec![record.id.to_string()];
        for name in schema.field_names() {
            let cell = match record.get(name) {
                Some(value) if name == "due_date" && record.is_overdue(today) => {
                    format!("{} (overdue)", value)
                }
                Some(value) => value.to_string(),
                None => String::new(),
            };
            row.push(cell);
        }
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::psql());

    let noun = if records.len() == 1 { "record" } else { "records" };
    format!("{}\n{} {}", table, records.len(), noun)
}

/// Format a single record's details
pub fn format_record_details(schema: &Schema, record: &Record) -> String {
    let label = record.text(schema.label_field()).unwrap_or("");
    let width = schema
        .field_names()
        .iter()
        .map(|n| field_heading(n).len())
        .max()
        .unwrap_or(0)
        .max("Updated".len());

    let mut output = String::new();
    output.push_str(&format!("{} {}: {}\n", schema.kind().entity_name(), record.id, label));

    for name in schema.field_names() {
        let value = record.get(name).map(|v| v.to_string()).unwrap_or_default();
        output.push_str(&format!(
            "  {:<width$}  {}\n",
            format!("{}:", field_heading(name)),
            value,
            width = width + 1
        ));
    }

    output.push('\n');
    output.push_str(&format!(
        "  {:<width$}  {}\n",
        "Created:",
        record.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        width = width + 1
    ));
    output.push_str(&format!(
        "  {:<width$}  {}\n",
        "Updated:",
        record.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        width = width + 1
    ));

    output
}
