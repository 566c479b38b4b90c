//! PL-008: Build variables, references and redaction tracking.
//!
//! A reference `((source:path.field))` names a variable in a source. The
//! source `.` is the build's own local scope (see [`scope::BuildVariables`]).

pub mod scope;

pub use scope::BuildVariables;

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Source name of the current build-local scope.
pub const LOCAL_SOURCE: &str = ".";

const REDACTED: &str = "((redacted))";

/// Variable lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VarsError {
    #[error("cannot find field '{field}' in var '{name}'")]
    MissingField { name: String, field: String },

    #[error("invalid var reference '{0}'")]
    InvalidReference(String),

    #[error("variable scope lock poisoned")]
    Poisoned,
}

/// A reference to a variable, optionally qualified by source and field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Reference {
    pub source: String,
    pub path: String,
    pub fields: Vec<String>,
}

impl Reference {
    /// Reference to a variable in the current build-local scope.
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            source: LOCAL_SOURCE.to_string(),
            path: path.into(),
            fields: Vec::new(),
        }
    }

    /// Parse `source:path.field1.field2`; the `((...))` wrapper is optional.
    pub fn parse(s: &str) -> Result<Self, VarsError> {
        let inner = s
            .trim()
            .strip_prefix("((")
            .and_then(|r| r.strip_suffix("))"))
            .unwrap_or(s)
            .trim();

        let (source, rest) = match inner.split_once(':') {
            Some((source, rest)) => (source, rest),
            None => ("", inner),
        };

        let mut segments = rest.split('.');
        let path = segments.next().unwrap_or_default();
        let fields: Vec<String> = segments.map(str::to_string).collect();

        if path.is_empty() || fields.iter().any(String::is_empty) {
            return Err(VarsError::InvalidReference(s.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            path: path.to_string(),
            fields,
        })
    }

    pub fn without_source(&self) -> Self {
        Self {
            source: String::new(),
            ..self.clone()
        }
    }

    /// Descend through `fields` of a found value.
    fn traverse(&self, mut value: Value) -> Result<Value, VarsError> {
        for field in &self.fields {
            value = match value {
                Value::Object(mut map) => map.remove(field),
                _ => None,
            }
            .ok_or_else(|| VarsError::MissingField {
                name: self.to_string(),
                field: field.clone(),
            })?;
        }
        Ok(value)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("((")?;
        if !self.source.is_empty() {
            write!(f, "{}:", self.source)?;
        }
        f.write_str(&self.path)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        f.write_str("))")
    }
}

/// Anything that can resolve variable references.
pub trait Variables: Send + Sync {
    /// `Ok(None)` when no variable of that name exists.
    ///
    /// Build-local values are only visible through references whose source
    /// is `.`; an unscoped `((name))` skips the locals of a [`BuildVariables`]
    /// scope and resolves through its parents.
    fn get(&self, reference: &Reference) -> Result<Option<Value>, VarsError>;

    fn list(&self) -> Result<Vec<Reference>, VarsError>;
}

/// A flat name → value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticVariables(IndexMap<String, Value>);

impl StaticVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for StaticVariables {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Variables for StaticVariables {
    fn get(&self, reference: &Reference) -> Result<Option<Value>, VarsError> {
        match self.0.get(&reference.path) {
            Some(value) => reference.traverse(value.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Reference>, VarsError> {
        Ok(self
            .0
            .keys()
            .map(|name| Reference {
                path: name.clone(),
                ..Default::default()
            })
            .collect())
    }
}

/// Records sensitive values so build output can be scrubbed.
#[derive(Debug, Default)]
pub struct Tracker {
    enabled: bool,
    tracked: Mutex<IndexMap<String, Value>>,
}

impl Tracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            tracked: Mutex::new(IndexMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Remember `value` as sensitive. No-op when redaction is disabled.
    pub fn track(&self, reference: &Reference, value: &Value) {
        if !self.enabled {
            return;
        }
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.to_string(), value.clone());
    }

    /// Every non-empty string leaf of every tracked value.
    pub fn tracked_values(&self) -> Vec<String> {
        let tracked = self.tracked.lock().unwrap_or_else(PoisonError::into_inner);
        let mut leaves = Vec::new();
        for value in tracked.values() {
            collect_leaves(value, &mut leaves);
        }
        leaves
    }

    /// Replace every tracked value in `text` with `((redacted))`.
    pub fn redact(&self, text: &str) -> String {
        let mut secrets = self.tracked_values();
        // Longest first so a secret containing another is replaced whole.
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        secrets
            .iter()
            .fold(text.to_string(), |out, secret| out.replace(secret.as_str(), REDACTED))
    }
}

fn collect_leaves(value: &Value, leaves: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => leaves.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, leaves)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, leaves)),
        _ => {}
    }
}
