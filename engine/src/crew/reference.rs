//! Back-reference parsing and input resolution
//!
//! A template value that is a string starting with `{{` is a reference
//! expression. Well-formed expressions have the shape
//! `{{ <task> . output . <field> }}` and resolve to the stored value of
//! `field` in `task`'s output. Anything that cannot be resolved becomes the
//! literal sentinel [`UNKNOWN`].

use crew_sdk::Record;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::store::OutputStore;

/// Substituted for any reference that cannot be resolved
pub const UNKNOWN: &str = "UNKNOWN";

/// Opening delimiter of a reference expression
const OPEN: &str = "{{";

/// A parsed `{{task.output.field}}` back-reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub task: String,
    pub field: String,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\{\{\s*([^.{}\s][^.{}]*?)\s*\.\s*output\s*\.\s*([^.{}\s][^.{}]*?)\s*\}\}$")
            .expect("Invalid reference pattern")
    })
}

impl Reference {
    pub fn new(task: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            field: field.into(),
        }
    }

    /// Parse a reference expression. Returns `None` when `text` is not a
    /// well-formed `{{task.output.field}}` expression.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = reference_pattern().captures(text.trim())?;
        Some(Self::new(&captures[1], &captures[2]))
    }

    /// Look the reference up in the store
    pub fn lookup<'a>(&self, store: &'a OutputStore) -> Option<&'a Value> {
        store.field(&self.task, &self.field)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}.output.{}}}}}", self.task, self.field)
    }
}

/// Whether a template value is a reference expression
pub fn is_reference_expression(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with(OPEN))
}

/// Resolve a single template value against the store.
///
/// Non-references are returned unchanged. The resolved value is never
/// resolved again, even if it looks like a reference itself.
pub fn resolve_value(value: &Value, store: &OutputStore) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    if !text.starts_with(OPEN) {
        return value.clone();
    }

    let Some(reference) = Reference::parse(text) else {
        warn!("Malformed reference expression '{}', using {}", text, UNKNOWN);
        return Value::String(UNKNOWN.to_string());
    };

    match reference.lookup(store) {
        Some(found) => found.clone(),
        None => {
            debug!("Unresolved reference {}, using {}", reference, UNKNOWN);
            Value::String(UNKNOWN.to_string())
        }
    }
}

/// Resolve every top-level entry of an input template.
///
/// Single pass, no side effects: resolving the same template against the
/// same store always yields the same record.
pub fn resolve_input(template: &Record, store: &OutputStore) -> Record {
    template
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, store)))
        .collect()
}
