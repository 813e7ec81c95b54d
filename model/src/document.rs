/*!

A structural document is the untyped body of a Kubernetes object: a tree of maps, lists and
scalars. Workload kinds that we do not know at compile time are handled through this type using
field paths (e.g. `["spec", "template", "spec", "containers"]`) instead of typed structs.

!*/

use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// A sequence of field names addressing a value nested inside of a [`Document`].
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `field` appended.
    pub fn join<S: Into<String>>(&self, field: S) -> Self {
        let mut fields = self.0.clone();
        fields.push(field.into());
        Self(fields)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&[&str]> for FieldPath {
    fn from(fields: &[&str]) -> Self {
        Self::new(fields.iter().copied())
    }
}

/// The untyped content of a Kubernetes object (everything other than `apiVersion`, `kind` and
/// `metadata`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns the value at `path`, or `None` if any field along the way is missing or is not a
    /// map.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.fields()
            .iter()
            .try_fold(&self.0, |value, field| value.as_object()?.get(field))
    }

    /// Reads the array at `path`. A missing field is `Ok(None)`, whereas a field that exists but
    /// is not an array is an error.
    pub fn nested_array(&self, path: &FieldPath) -> Result<Option<Vec<Value>>> {
        match self.get(path) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.clone())),
            Some(other) => Err(error::StructuralReadSnafu {
                path: path.to_string(),
                expected: "an array",
                found: kind_of(other),
            }
            .build()
            .into()),
        }
    }

    /// Writes `items` at `path`, creating intermediate maps as needed. Only the addressed field
    /// is replaced.
    pub fn set_array(&mut self, path: &FieldPath, items: Vec<Value>) -> Result<()> {
        self.set_field(path, Value::Array(items))
    }

    /// Returns a deep copy of the value at `path`.
    pub fn field_copy(&self, path: &FieldPath) -> Option<Value> {
        self.get(path).cloned()
    }

    /// Writes `value` at `path`, creating intermediate maps as needed. An intermediate field
    /// holding something other than a map (or null) is an error.
    pub fn set_field(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        let (last, parents) = match path.fields().split_last() {
            Some(split) => split,
            None => {
                self.0 = value;
                return Ok(());
            }
        };
        let mut current = &mut self.0;
        let mut walked = FieldPath::default();
        for field in parents {
            walked = walked.join(field.as_str());
            current = child_map(current, &walked)?
                .entry(field.clone())
                .or_insert(Value::Null);
        }
        child_map(current, path)?.insert(last.clone(), value);
        Ok(())
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Turns `value` into a map if it is null and returns it, errors if it is some other scalar.
fn child_map<'a>(value: &'a mut Value, path: &FieldPath) -> Result<&'a mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    let found = kind_of(value);
    value.as_object_mut().ok_or_else(|| {
        error::StructuralReadSnafu {
            path: path.to_string(),
            expected: "a map",
            found,
        }
        .build()
        .into()
    })
}

/// Returns the `name` field of `entry`, the element at `index` of the array at `path`. Entries of
/// named arrays (containers, volumes, volume mounts) must be maps, anything else is an error.
pub fn entry_name<'a>(
    path: &FieldPath,
    index: usize,
    entry: &'a Value,
) -> Result<Option<&'a str>> {
    let map = entry.as_object().ok_or_else(|| -> crate::Error {
        error::StructuralEntrySnafu {
            path: path.to_string(),
            index,
            expected: "a map",
            found: kind_of(entry),
        }
        .build()
        .into()
    })?;
    Ok(map.get("name").and_then(Value::as_str))
}

/// A short human readable name for the variant of `value`.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}
