//! Result rows
//!
//! Rows returned by `run_query` keep the server's column order and expose
//! values as `serde_json::Value`.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// One result row: ordered column names with their values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Builder-style [`Row::push`]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Value of a column by name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value of a column by position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Column names in server order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in server order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(column, value)` pairs in server order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Render a value the way the REPL prints it
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert one text-protocol column value to JSON.
///
/// `type_name` is the MySQL column type as reported by the driver; `bytes`
/// is the value's textual wire form.
pub fn column_value(type_name: &str, bytes: &[u8]) -> Value {
    let upper = type_name.to_ascii_uppercase();
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return Value::String(hex(bytes)),
    };

    match upper.as_str() {
        "NULL" => Value::Null,
        "BOOLEAN" => match text {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            _ => Value::String(text.to_string()),
        },
        t if t.ends_with("UNSIGNED") && is_integer_type(t) => text
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        t if is_integer_type(t) => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        "FLOAT" | "DOUBLE" => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        _ => Value::String(text.to_string()),
    }
}

fn is_integer_type(type_name: &str) -> bool {
    ["TINYINT", "SMALLINT", "MEDIUMINT", "INT", "BIGINT", "YEAR"]
        .iter()
        .any(|t| type_name == *t || type_name.starts_with(&format!("{} ", t)))
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02X}", b));
    }
    out
}
