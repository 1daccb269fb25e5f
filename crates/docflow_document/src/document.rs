//! Documents with dotted-path access.
//!
//! A path such as `_cluster_.title_vector_.kmeans-8` addresses nested map
//! entries. Reads through a missing or non-map segment return `None`;
//! writes create intermediate maps, replacing any scalar in the way.

use crate::error::{DocumentError, DocumentResult};
use crate::value::Value;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// Field holding the document identifier.
pub const ID_FIELD: &str = "_id";

/// Field holding the server-side insertion timestamp.
pub const INSERT_DATE_FIELD: &str = "insert_date_";

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '.';

/// A single record of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            root: Value::empty_map(),
        }
    }

    /// Creates a document holding only an `_id`.
    pub fn with_id(id: impl Into<Value>) -> Self {
        let mut document = Self::new();
        document.set(ID_FIELD, id);
        document
    }

    /// Wraps a map value.
    pub fn from_value(value: Value) -> DocumentResult<Self> {
        match value {
            Value::Map(_) => Ok(Self { root: value }),
            other => Err(DocumentError::NotAMap {
                found: other.kind(),
            }),
        }
    }

    /// Builds a document from a JSON object.
    pub fn from_json(value: serde_json::Value) -> DocumentResult<Self> {
        Self::from_value(Value::from(value))
    }

    /// Parses a document from JSON text.
    pub fn from_json_str(text: &str) -> DocumentResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(value)
    }

    /// Converts the document to a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(&self.root)
    }

    /// Returns the document as a map value.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consumes the document, returning its map value.
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Returns the `_id` value, if present.
    pub fn id_value(&self) -> Option<&Value> {
        self.root.get(ID_FIELD)
    }

    /// Returns the `_id` as text. Integer ids are rendered in decimal.
    pub fn id(&self) -> Option<String> {
        match self.id_value()? {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.root.as_map().map_or(0, <[_]>::len)
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over top-level fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.root
            .as_map()
            .unwrap_or_default()
            .iter()
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Reads the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split(PATH_SEPARATOR)
            .try_fold(&self.root, |current, segment| current.get(segment))
    }

    /// Reads the value at a dotted path for mutation.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        path.split(PATH_SEPARATOR)
            .try_fold(&mut self.root, |current, segment| current.get_mut(segment))
    }

    /// Reads the value at a dotted path, falling back to `default`.
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// Returns true if a value exists at the path.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Writes a value at a dotted path, creating intermediate maps.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in segments {
            let needs_map = !matches!(current.get(segment), Some(Value::Map(_)));
            if needs_map {
                current.insert(segment, Value::empty_map());
            }
            current = match current.get_mut(segment) {
                Some(next) => next,
                None => return,
            };
        }
        current.insert(last, value.into());
    }

    /// Removes the value at a dotted path. Empty parent maps are kept.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once(PATH_SEPARATOR) {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        let mut current = &mut self.root;
        if let Some(parent) = parent {
            for segment in parent.split(PATH_SEPARATOR) {
                current = current.get_mut(segment)?;
            }
        }
        current.remove(last)
    }

    /// Returns the dotted path of every leaf in the document.
    ///
    /// Nested maps are descended; arrays, scalars and empty maps are leaves.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(pairs) = self.root.as_map() {
            collect_leaf_paths(pairs, None, &mut keys);
        }
        keys
    }
}

fn collect_leaf_paths(pairs: &[(String, Value)], prefix: Option<&str>, out: &mut Vec<String>) {
    for (key, value) in pairs {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Map(children) if !children.is_empty() => {
                collect_leaf_paths(children, Some(&path), out);
            }
            _ => out.push(path),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = DocumentError;

    fn try_from(value: serde_json::Value) -> DocumentResult<Self> {
        Self::from_json(value)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(serde::de::Error::custom)
    }
}
