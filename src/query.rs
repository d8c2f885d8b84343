//! Record search
//!
//! A [`Query`] maps field names to match rules. The engine compiles it
//! against the store's schema, rejecting anything that cannot match
//! meaningfully, then filters a snapshot of the store with it.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RecordbookError, RecordbookResult};
use crate::models::{parse_date, FieldType, FieldValue, Priority, Record, Schema, Status, StatusSet};
use crate::storage::RecordStore;

/// How one field is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    /// Equal value; text is compared case-insensitively
    Exact(String),
    /// Case-insensitive substring of a text field
    Contains(String),
    /// Inclusive date range; at least one bound
    Range {
        from: Option<String>,
        to: Option<String>,
    },
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => write!(f, "={}", value),
            Self::Contains(value) => write!(f, "~{}", value),
            Self::Range { from, to } => write!(
                f,
                ":{}..{}",
                from.as_deref().unwrap_or(""),
                to.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Conjunction of field predicates; empty matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    predicates: BTreeMap<String, MatchRule>,
}

impl Query {
    /// Create a new empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate, replacing any earlier one on the same field
    pub fn with(mut self, field: impl Into<String>, rule: MatchRule) -> Self {
        self.predicates.insert(field.into(), rule);
        self
    }

    pub fn exact(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field, MatchRule::Exact(value.into()))
    }

    pub fn contains(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field, MatchRule::Contains(value.into()))
    }

    /// Filter by date range
    pub fn range(
        self,
        field: impl Into<String>,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Self {
        self.with(
            field,
            MatchRule::Range {
                from: from.map(str::to_string),
                to: to.map(str::to_string),
            },
        )
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &BTreeMap<String, MatchRule> {
        &self.predicates
    }

    /// Build a query from predicate strings like `status=completed`
    ///
    /// Each field may be named once; a second predicate on the same field
    /// is an error rather than a silent replacement.
    pub fn parse<I, S>(predicates: I) -> RecordbookResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        predicates
            .into_iter()
            .try_fold(Self::new(), |query, text| {
                let (field, rule) = parse_predicate(text.as_ref())?;
                if query.predicates.contains_key(&field) {
                    return Err(RecordbookError::InvalidQuery(format!(
                        "field '{}' appears more than once",
                        field
                    )));
                }
                Ok(query.with(field, rule))
            })
    }
}

/// Parse `field=value`, `field~value` or `field:FROM..TO`
pub fn parse_predicate(text: &str) -> RecordbookResult<(String, MatchRule)> {
    let invalid = |reason: &str| {
        RecordbookError::InvalidQuery(format!("'{}': {}", text, reason))
    };

    let split = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .ok_or_else(|| invalid("expected field=value, field~value or field:FROM..TO"))?;

    let field = text[..split].trim();
    if field.is_empty() {
        return Err(invalid("missing field name"));
    }

    let op = text[split..].chars().next().unwrap_or('=');
    let value = text[split + op.len_utf8()..].trim();

    let rule = match op {
        '=' => MatchRule::Exact(value.to_string()),
        '~' => MatchRule::Contains(value.to_string()),
        ':' => {
            let (from, to) = value
                .split_once("..")
                .ok_or_else(|| invalid("range must look like FROM..TO"))?;
            let bound = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
            MatchRule::Range {
                from: bound(from),
                to: bound(to),
            }
        }
        _ => return Err(invalid("unknown operator")),
    };

    Ok((field.to_string(), rule))
}

/// A predicate checked against one field value
#[derive(Debug, Clone)]
enum Matcher {
    TextEquals(String),
    TextContains(String),
    Equals(FieldValue),
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl Matcher {
    fn matches(&self, value: &FieldValue) -> bool {
        match self {
            Self::TextEquals(needle) => value
                .as_text()
                .is_some_and(|text| text.to_lowercase() == *needle),
            Self::TextContains(needle) => value
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(needle.as_str())),
            Self::Equals(expected) => value == expected,
            Self::DateRange { from, to } => value.as_date().is_some_and(|date| {
                from.map_or(true, |from| date >= from) && to.map_or(true, |to| date <= to)
            }),
        }
    }
}

/// Query compiled against a schema
struct CompiledQuery {
    matchers: Vec<(String, Matcher)>,
}

impl CompiledQuery {
    fn compile(schema: &Schema, query: &Query) -> RecordbookResult<Self> {
        let matchers = query
            .predicates()
            .iter()
            .map(|(field, rule)| compile_rule(schema, field, rule).map(|m| (field.clone(), m)))
            .collect::<RecordbookResult<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    fn matches(&self, record: &Record) -> bool {
        self.matchers.iter().all(|(field, matcher)| {
            record
                .get(field)
                .is_some_and(|value| matcher.matches(value))
        })
    }
}

fn compile_rule(schema: &Schema, field: &str, rule: &MatchRule) -> RecordbookResult<Matcher> {
    let spec = schema.field(field).ok_or_else(|| {
        RecordbookError::InvalidQuery(format!(
            "unknown field '{}' for {} records",
            field,
            schema.kind()
        ))
    })?;

    let invalid = |reason: String| RecordbookError::InvalidQuery(format!("{}: {}", field, reason));

    let parse_bound = |raw: &str| {
        parse_date(raw).ok_or_else(|| invalid(format!("'{}' is not a YYYY-MM-DD date", raw)))
    };

    match (rule, spec.field_type) {
        (MatchRule::Exact(value), t) if t.is_textual() => {
            Ok(Matcher::TextEquals(value.to_lowercase()))
        }
        (MatchRule::Exact(value), FieldType::Priority) => Priority::parse(value)
            .map(|p| Matcher::Equals(FieldValue::Priority(p)))
            .ok_or_else(|| invalid(format!("'{}' is not a priority", value))),
        (MatchRule::Exact(value), FieldType::Status) => {
            let set = schema.status_set().unwrap_or(StatusSet::Extended);
            Status::parse(value)
                .filter(|s| set.allows(*s))
                .map(|s| Matcher::Equals(FieldValue::Status(s)))
                .ok_or_else(|| {
                    invalid(format!(
                        "'{}' is not one of: {}",
                        value,
                        set.names().join(", ")
                    ))
                })
        }
        (MatchRule::Exact(value), FieldType::Date) => {
            Ok(Matcher::Equals(FieldValue::Date(parse_bound(value)?)))
        }
        (MatchRule::Contains(value), t) if t.is_textual() => {
            Ok(Matcher::TextContains(value.to_lowercase()))
        }
        (MatchRule::Contains(_), _) => Err(invalid("substring match needs a text field".into())),
        (MatchRule::Range { from, to }, FieldType::Date) => {
            let from = from.as_deref().map(parse_bound).transpose()?;
            let to = to.as_deref().map(parse_bound).transpose()?;
            match (from, to) {
                (None, None) => Err(invalid("range needs at least one bound".into())),
                (Some(f), Some(t)) if f > t => {
                    Err(invalid(format!("range start {} is after end {}", f, t)))
                }
                (from, to) => Ok(Matcher::DateRange { from, to }),
            }
        }
        (MatchRule::Range { .. }, _) => Err(invalid("range match needs a date field".into())),
        (MatchRule::Exact(_), _) => Err(invalid("unsupported match".into())),
    }
}

/// Read-only search over a store
pub struct QueryEngine<'a> {
    store: &'a RecordStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Records matching every predicate of `query`, in insertion order
    pub fn search(&self, query: &Query) -> RecordbookResult<Vec<Record>> {
        let compiled = CompiledQuery::compile(self.store.schema(), query)?;
        let records = self.store.list()?;
        Ok(records
            .into_iter()
            .filter(|record| compiled.matches(record))
            .collect())
    }

    /// Records with `term` in any free-text field, ignoring case
    pub fn search_text(&self, term: &str) -> RecordbookResult<Vec<Record>> {
        let needle = term.trim().to_lowercase();
        let text_fields: Vec<&str> = self
            .store
            .schema()
            .fields()
            .iter()
            .filter(|f| f.field_type.is_textual())
            .map(|f| f.name)
            .collect();

        let records = self.store.list()?;
        Ok(records
            .into_iter()
            .filter(|record| {
                text_fields.iter().any(|field| {
                    record
                        .text(field)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawFields, RecordKind};
    use crate::storage::{open_backend, BackendKind};
    use tempfile::TempDir;

    fn raw(pairs: &[(&str, &str)]) -> RawFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn store(dir: &TempDir, kind: RecordKind) -> RecordStore {
        let schema = Schema::for_kind(kind);
        let backend = open_backend(
            BackendKind::Json,
            dir.path().join(format!("{}.json", kind.as_str())),
            &schema,
        );
        RecordStore::open(schema, backend).unwrap()
    }

    fn planner(dir: &TempDir) -> RecordStore {
        let store = store(dir, RecordKind::Planner);
        for (title, priority, due, category) in [
            ("Write report", "high", "2099-01-10", "Work"),
            ("Book dentist", "low", "2099-02-01", "Health"),
            ("Prepare slides", "High", "2099-03-15", "work"),
        ] {
            store
                .create(&raw(&[
                    ("title", title),
                    ("priority", priority),
                    ("due_date", due),
                    ("category", category),
                ]))
                .unwrap();
        }
        store
    }

    fn titles(records: &[Record]) -> Vec<&str> {
        records.iter().filter_map(|r| r.text("title")).collect()
    }

    #[test]
    fn test_parse_predicates() {
        assert_eq!(
            parse_predicate("priority=High").unwrap(),
            ("priority".into(), MatchRule::Exact("High".into()))
        );
        assert_eq!(
            parse_predicate("title~ report ").unwrap(),
            ("title".into(), MatchRule::Contains("report".into()))
        );
        assert_eq!(
            parse_predicate("due_date:2099-01-01..").unwrap(),
            (
                "due_date".into(),
                MatchRule::Range {
                    from: Some("2099-01-01".into()),
                    to: None
                }
            )
        );
        assert_eq!(
            parse_predicate("title=Meeting: 10am").unwrap().1,
            MatchRule::Exact("Meeting: 10am".into())
        );

        assert!(parse_predicate("priority").is_err());
        assert!(parse_predicate("=high").is_err());
        assert!(parse_predicate("due_date:2099-01-01").is_err());
        assert!(parse_predicate("title>3").is_err());
    }

    #[test]
    fn test_empty_query_matches_all() {
        let temp_dir = TempDir::new().unwrap();
        let store = planner(&temp_dir);

        let results = QueryEngine::new(&store).search(&Query::new()).unwrap();
        assert_eq!(results, store.list().unwrap());
    }

    #[test]
    fn test_exact_priority_returns_subset() {
        let temp_dir = TempDir::new().unwrap();
        let store = planner(&temp_dir);

        let results = QueryEngine::new(&store)
            .search(&Query::new().exact("priority", "High"))
            .unwrap();

        let expected: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .filter(|r| r.priority() == Some(Priority::High))
            .collect();
        assert_eq!(results, expected);
        assert_eq!(titles(&results), vec!["Write report", "Prepare slides"]);
    }

    #[test]
    fn test_text_matching_ignores_case() {
        let temp_dir = TempDir::new().unwrap();
        let store = planner(&temp_dir);
        let engine = QueryEngine::new(&store);

        let exact = engine.search(&Query::new().exact("category", "WORK")).unwrap();
        assert_eq!(exact.len(), 2);

        let contains = engine.search(&Query::new().contains("title", "SLID")).unwrap();
        assert_eq!(titles(&contains), vec!["Prepare slides"]);
    }

    #[test]
    fn test_date_range_and_conjunction() {
        let temp_dir = TempDir::new().unwrap();
        let store = planner(&temp_dir);
        let engine = QueryEngine::new(&store);

        let jan_feb = engine
            .search(&Query::new().range("due_date", Some("2099-01-10"), Some("2099-02-01")))
            .unwrap();
        assert_eq!(titles(&jan_feb), vec!["Write report", "Book dentist"]);

        let open_ended = engine
            .search(&Query::new().range("due_date", None, Some("2099-01-31")))
            .unwrap();
        assert_eq!(titles(&open_ended), vec!["Write report"]);

        let both = engine
            .search(
                &Query::new()
                    .exact("priority", "high")
                    .range("due_date", Some("2099-02-01"), None),
            )
            .unwrap();
        assert_eq!(titles(&both), vec!["Prepare slides"]);
    }

    #[test]
    fn test_invalid_queries() {
        let temp_dir = TempDir::new().unwrap();
        let store = planner(&temp_dir);
        let engine = QueryEngine::new(&store);

        let cases = [
            Query::new().exact("colour", "red"),
            Query::new().exact("priority", "urgent"),
            Query::new().exact("due_date", "soon"),
            Query::new().contains("priority", "hi"),
            Query::new().range("title", Some("a"), None),
            Query::new().range("due_date", None, None),
            Query::new().range("due_date", Some("2099-03-01"), Some("2099-01-01")),
        ];

        for query in cases {
            let err = engine.search(&query).unwrap_err();
            assert!(
                matches!(err, RecordbookError::InvalidQuery(_)),
                "expected InvalidQuery for {:?}",
                query
            );
        }
    }

    #[test]
    fn test_status_outside_set_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, RecordKind::Todo);
        let engine = QueryEngine::new(&store);

        assert!(engine.search(&Query::new().exact("status", "completed")).is_ok());
        assert!(matches!(
            engine.search(&Query::new().exact("status", "in_progress")),
            Err(RecordbookError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_search_text_across_contact_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir, RecordKind::Contacts);
        store
            .create(&raw(&[
                ("name", "Ada Lovelace"),
                ("phone", "+44 20 7946 0018"),
                ("email", "ada@analytical.org"),
            ]))
            .unwrap();
        store
            .create(&raw(&[
                ("name", "Grace Hopper"),
                ("phone", "555-0100-300"),
                ("email", "grace@navy.mil"),
            ]))
            .unwrap();
        let engine = QueryEngine::new(&store);

        let by_email = engine.search_text("ANALYTICAL").unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].text("name"), Some("Ada Lovelace"));

        assert_eq!(engine.search_text("0100").unwrap().len(), 1);
        assert!(engine.search_text("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_parse_query_from_strings() {
        let query = Query::parse(["priority=high", "title~report"]).unwrap();
        assert_eq!(query.predicates().len(), 2);
        assert!(Query::parse(["nonsense"]).is_err());
    }

    #[test]
    fn test_parse_rejects_repeated_field() {
        let err = Query::parse(["status=pending", "status=completed"]).unwrap_err();
        assert!(matches!(err, RecordbookError::InvalidQuery(ref msg) if msg.contains("status")));

        // A second predicate on a field counts even with another operator
        let err = Query::parse(["due_date:2030-01-01..", "due_date:..2030-12-31"]).unwrap_err();
        assert!(matches!(err, RecordbookError::InvalidQuery(_)));

        // The builder still lets callers replace a predicate on purpose
        let query = Query::new().exact("status", "pending").exact("status", "completed");
        assert_eq!(
            query.predicates().get("status"),
            Some(&MatchRule::Exact("completed".into()))
        );
    }
}
