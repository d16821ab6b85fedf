// ── Schema-less entity ──
//
// Backend records arrive as arbitrary JSON objects whose fields vary by
// deployment. `Entity` keeps the raw map (insertion order preserved) and
// offers defensive accessors that never fail: a missing field or a field
// of the wrong type reads as `None`, display helpers fall back to a
// placeholder.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Display value for fields the backend did not send.
pub const PLACEHOLDER: &str = "N/A";

/// A single backend record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; anything but an object yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // ── Raw access ───────────────────────────────────────────────────

    /// Field value, with JSON `null` treated as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Follow a dotted path through nested objects (`network.nom`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part).filter(|v| !v.is_null())?;
        }
        Some(current)
    }

    // ── Typed accessors ──────────────────────────────────────────────

    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field)?.as_str()
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field)?.as_bool()
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        self.get(field)?.as_f64()
    }

    /// Scalar field rendered as text. Empty strings count as absent, so
    /// this composes into `a || b || c` style fallback chains.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get_path(field).and_then(scalar_text)
    }

    /// First non-empty scalar among `fields`.
    pub fn first_text(&self, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|f| self.text(f))
    }

    /// Text or [`PLACEHOLDER`].
    pub fn display(&self, field: &str) -> String {
        self.text(field).unwrap_or_else(|| PLACEHOLDER.to_owned())
    }

    /// Loose truthiness: missing, `null`, `false`, `0`, `""` read as false.
    pub fn truthy(&self, field: &str) -> bool {
        self.get(field).is_some_and(is_truthy)
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// `id`, else the first present field of `fallbacks`.
    pub fn identity(&self, fallbacks: &[&str]) -> Option<&Value> {
        std::iter::once("id")
            .chain(fallbacks.iter().copied())
            .find_map(|f| self.get(f).filter(|v| !is_blank(v)))
    }

    /// Stable key for display and lookups; falls back to the position in
    /// the collection when the record carries no identity field.
    pub fn key(&self, fallbacks: &[&str], index: usize) -> EntityKey {
        match self.identity(fallbacks).and_then(scalar_text) {
            Some(id) => EntityKey::Id(id),
            None => EntityKey::Position(index),
        }
    }

    /// Copy of this entity with `patch` fields overwritten. Existing
    /// fields keep their position; new ones are appended.
    pub fn merged(&self, patch: &Map<String, Value>) -> Self {
        let mut fields = self.0.clone();
        for (k, v) in patch {
            fields.insert(k.clone(), v.clone());
        }
        Self(fields)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

// ── EntityKey ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Id(String),
    Position(usize),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Position(i) => write!(f, "#{i}"),
        }
    }
}

// ── Value helpers ────────────────────────────────────────────────────

/// Strings as-is, numbers and booleans via `Display`; everything else
/// (null, objects, arrays, empty strings) is `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}
