use std::collections::HashMap;
use std::fmt;

/// One field value. The browser never interprets values beyond stringifying
/// them for search and display.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Num(f),
                None => Value::Str(n.to_string()),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            // Nested structures collapse to their compact json text
            other => Value::Str(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            // Integral numbers render without a trailing ".0", like the
            // json they usually came from
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

/// One row of domain data: an opaque mapping from field name to value.
/// Records never learn which columns exist; the browser reads fields by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True if any field's display string contains the needle. The needle
    /// has to be lowercased by the caller; this runs once per record per
    /// keystroke and must not re-lowercase the query every time.
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.fields
            .values()
            .any(|v| v.to_string().to_lowercase().contains(needle_lower))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_coercion() {
        assert_eq!(Value::Str("ana".into()).to_string(), "ana");
        assert_eq!(Value::Num(4.0).to_string(), "4");
        assert_eq!(Value::Num(4.5).to_string(), "4.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_from_json_scalars() {
        let doc: serde_json::Value =
            serde_json::from_str(r#"{"a": "x", "b": 2, "c": true, "d": null}"#).unwrap();
        assert_eq!(Value::from_json(&doc["a"]), Value::Str("x".into()));
        assert_eq!(Value::from_json(&doc["b"]), Value::Num(2.0));
        assert_eq!(Value::from_json(&doc["c"]), Value::Bool(true));
        assert_eq!(Value::from_json(&doc["d"]), Value::Null);
    }

    #[test]
    fn test_from_json_nested_collapses_to_text() {
        let doc: serde_json::Value = serde_json::from_str(r#"{"tags": ["a", "b"]}"#).unwrap();
        assert_eq!(
            Value::from_json(&doc["tags"]),
            Value::Str(r#"["a","b"]"#.into())
        );
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let mut record = Record::new();
        record.set("name", Value::Str("Ana Torres".into()));
        record.set("visits", Value::Num(12.0));
        assert!(record.matches("torres"));
        assert!(record.matches("12"));
        assert!(!record.matches("gomez"));
    }

    #[test]
    fn test_null_fields_never_match() {
        let mut record = Record::new();
        record.set("phone", Value::Null);
        assert!(!record.matches("null"));
        assert!(!record.matches("0"));
    }
}
