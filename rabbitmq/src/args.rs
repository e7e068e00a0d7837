//! Argument type coercion
//!
//! Terraform carries every argument value as a string with a type label next
//! to it; the broker wants native JSON. These helpers convert in both
//! directions.

use crate::api::common::ArgumentTable;
use serde_json::{Number, Value};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentType {
    #[default]
    String,
    Numeric,
    Boolean,
    List,
}

impl ArgumentType {
    pub const LABELS: [&'static str; 4] = ["string", "numeric", "boolean", "list"];

    /// Unknown labels fall back to `String`
    pub fn from_label(label: &str) -> Self {
        match label {
            "numeric" => ArgumentType::Numeric,
            "boolean" => ArgumentType::Boolean,
            "list" => ArgumentType::List,
            _ => ArgumentType::String,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArgumentType::String => "string",
            ArgumentType::Numeric => "numeric",
            ArgumentType::Boolean => "boolean",
            ArgumentType::List => "list",
        }
    }
}

impl fmt::Display for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentEntry {
    pub key: String,
    pub value: String,
    pub r#type: ArgumentType,
}

impl ArgumentEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, r#type: ArgumentType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            r#type,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("argument {key}: failed to parse number {value:?}")]
    Numeric { key: String, value: String },

    #[error("argument {key}: failed to parse boolean {value:?}")]
    Boolean { key: String, value: String },
}

/// Converts a typed string entry into the JSON value the broker expects
pub fn value_from_typed(entry: &ArgumentEntry) -> Result<Value, ArgumentError> {
    match entry.r#type {
        ArgumentType::Numeric => parse_number(&entry.value)
            .ok_or_else(|| ArgumentError::Numeric {
                key: entry.key.clone(),
                value: entry.value.clone(),
            }),
        ArgumentType::Boolean => match entry.value.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ArgumentError::Boolean {
                key: entry.key.clone(),
                value: entry.value.clone(),
            }),
        },
        ArgumentType::String | ArgumentType::List => Ok(Value::String(entry.value.clone())),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let f: f64 = s.parse().ok()?;
    if !f.is_finite() {
        return None;
    }
    // integral values keep integer form on the wire
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        return Some(Value::Number(Number::from(f as i64)));
    }
    Number::from_f64(f).map(Value::Number)
}

pub fn type_from_value(value: &Value) -> ArgumentType {
    match value {
        Value::Number(_) => ArgumentType::Numeric,
        Value::Bool(_) => ArgumentType::Boolean,
        _ => ArgumentType::String,
    }
}

/// Renders a broker value as the string stored in state
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn to_arguments<'a, I>(entries: I) -> Result<ArgumentTable, ArgumentError>
where
    I: IntoIterator<Item = &'a ArgumentEntry>,
{
    let mut table = ArgumentTable::new();
    for entry in entries {
        table.insert(entry.key.clone(), value_from_typed(entry)?);
    }
    Ok(table)
}

/// Sorted by key so that state is stable across reads
pub fn from_arguments(table: &ArgumentTable) -> Vec<ArgumentEntry> {
    let mut entries: Vec<ArgumentEntry> = table
        .iter()
        .map(|(key, value)| ArgumentEntry::new(key, render_value(value), type_from_value(value)))
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries
}

/// Removes a structural key from the table, returning its string form
pub fn take_marker(table: &mut ArgumentTable, key: &str) -> Option<String> {
    table.remove(key).map(|v| render_value(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_string_becomes_number() {
        let entry = ArgumentEntry::new("x-message-ttl", "1000", ArgumentType::Numeric);
        assert_eq!(value_from_typed(&entry).unwrap(), json!(1000));

        let entry = ArgumentEntry::new("ratio", "0.5", ArgumentType::Numeric);
        assert_eq!(value_from_typed(&entry).unwrap(), json!(0.5));
    }

    #[test]
    fn bad_number_names_key_and_value() {
        let entry = ArgumentEntry::new("x-max-length", "lots", ArgumentType::Numeric);
        let err = value_from_typed(&entry).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument x-max-length: failed to parse number \"lots\""
        );

        let entry = ArgumentEntry::new("x-max-length", "inf", ArgumentType::Numeric);
        assert!(value_from_typed(&entry).is_err());
    }

    #[test]
    fn padded_number_is_rejected() {
        let entry = ArgumentEntry::new("x-max-length", " 1000 ", ArgumentType::Numeric);
        assert_eq!(
            value_from_typed(&entry).unwrap_err(),
            ArgumentError::Numeric {
                key: "x-max-length".to_string(),
                value: " 1000 ".to_string()
            }
        );
    }

    #[test]
    fn booleans_are_strict() {
        let entry = ArgumentEntry::new("x-single-active-consumer", "true", ArgumentType::Boolean);
        assert_eq!(value_from_typed(&entry).unwrap(), json!(true));

        let entry = ArgumentEntry::new("x-single-active-consumer", "yes", ArgumentType::Boolean);
        assert_eq!(
            value_from_typed(&entry).unwrap_err(),
            ArgumentError::Boolean {
                key: "x-single-active-consumer".to_string(),
                value: "yes".to_string()
            }
        );
    }

    #[test]
    fn list_and_unknown_labels_pass_through() {
        let entry = ArgumentEntry::new("k", "a,b", ArgumentType::List);
        assert_eq!(value_from_typed(&entry).unwrap(), json!("a,b"));
        assert_eq!(ArgumentType::from_label("weird"), ArgumentType::String);
    }

    #[test]
    fn read_back_renders_integral_numbers_without_fraction() {
        let mut table = ArgumentTable::new();
        table.insert("x-message-ttl".to_string(), json!(1000.0));
        table.insert("x-queue-mode".to_string(), json!("lazy"));
        table.insert("x-single-active-consumer".to_string(), json!(false));

        let entries = from_arguments(&table);
        assert_eq!(
            entries,
            vec![
                ArgumentEntry::new("x-message-ttl", "1000", ArgumentType::Numeric),
                ArgumentEntry::new("x-queue-mode", "lazy", ArgumentType::String),
                ArgumentEntry::new("x-single-active-consumer", "false", ArgumentType::Boolean),
            ]
        );
    }

    #[test]
    fn lists_read_back_as_strings() {
        assert_eq!(type_from_value(&json!(["a", "b"])), ArgumentType::String);
    }

    #[test]
    fn marker_is_removed_before_inference() {
        let mut table = to_arguments(&[
            ArgumentEntry::new("x-delayed-type", "topic", ArgumentType::String),
            ArgumentEntry::new("x-max", "5", ArgumentType::Numeric),
        ])
        .unwrap();

        assert_eq!(take_marker(&mut table, "x-delayed-type").as_deref(), Some("topic"));
        assert_eq!(take_marker(&mut table, "x-delayed-type"), None);
        assert_eq!(from_arguments(&table).len(), 1);
    }
}
