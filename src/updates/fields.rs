use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// URL grammar: optional lowercase scheme, dotted domain, optional path/query/fragment.
const SCHEME_PATTERN: &str = r"((?P<scheme>[a-z]+):(//)?)?";
const DOMAIN_PATTERN: &str = r"([\w-]+(\.[\w-]+)+)";
const PATH_PARAMS_ANCHOR_PATTERN: &str = r"([\w.,@?^=%&:/~+#-]*[\w@?^=%&/~+#-])?";

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b{}{}{}\b",
        SCHEME_PATTERN, DOMAIN_PATTERN, PATH_PARAMS_ANCHOR_PATTERN
    ))
    .expect("invalid URL pattern")
});

const ALLOWED_SCHEMES: [Option<&str>; 3] = [None, Some("http"), Some("https")];

/// Closed set of type tags a field table can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Emails,
    SplitStr,
    Link,
    Links,
    Int,
    Bool,
    Str,
}

impl FieldType {
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Emails => "emails",
            FieldType::SplitStr => "split_str",
            FieldType::Link => "link",
            FieldType::Links => "links",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Str => "string",
        }
    }
}

/// A formatted field value, as stored on an entity and recorded in a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn into_string(self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Str(s) => s,
            FieldValue::List(items) => items.join(","),
        }
    }

    pub fn into_opt_string(self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            other => Some(other.into_string()),
        }
    }

    pub fn into_opt_int(self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(i),
            FieldValue::Str(s) => s.trim().parse().ok(),
            FieldValue::Bool(b) => Some(i64::from(b)),
            FieldValue::Null | FieldValue::List(_) => None,
        }
    }

    pub fn into_bool(self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => b,
            FieldValue::Int(i) => i != 0,
            FieldValue::Str(s) => !s.is_empty(),
            FieldValue::List(items) => !items.is_empty(),
        }
    }

    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::Null => Vec::new(),
            FieldValue::List(items) => items,
            other => vec![other.into_string()],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Bad value for field {field} of type {field_type}: {value}")]
    BadValue {
        field: String,
        field_type: &'static str,
        value: String,
    },
}

impl FieldError {
    fn bad_value(field: &str, field_type: FieldType, value: &Value) -> Self {
        FieldError::BadValue {
            field: field.to_string(),
            field_type: field_type.tag(),
            value: value.to_string(),
        }
    }
}

/// A typed entity attribute that can be read and written as a `FieldValue`
pub trait FieldSlot {
    fn to_field_value(&self) -> FieldValue;
    fn assign(&mut self, value: FieldValue);
}

impl FieldSlot for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Str(self.clone())
    }

    fn assign(&mut self, value: FieldValue) {
        *self = value.into_string();
    }
}

impl FieldSlot for Option<String> {
    fn to_field_value(&self) -> FieldValue {
        self.clone().map(FieldValue::Str).unwrap_or(FieldValue::Null)
    }

    fn assign(&mut self, value: FieldValue) {
        *self = value.into_opt_string();
    }
}

impl FieldSlot for Option<i64> {
    fn to_field_value(&self) -> FieldValue {
        self.map(FieldValue::Int).unwrap_or(FieldValue::Null)
    }

    fn assign(&mut self, value: FieldValue) {
        *self = value.into_opt_int();
    }
}

impl FieldSlot for bool {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn assign(&mut self, value: FieldValue) {
        *self = value.into_bool();
    }
}

impl FieldSlot for Vec<String> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::List(self.clone())
    }

    fn assign(&mut self, value: FieldValue) {
        *self = value.into_list();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Newline,
}

/// Split text on the delimiter, trim each piece and drop blanks
pub fn split_input(text: &str, delimiter: Delimiter) -> Vec<String> {
    let separator = match delimiter {
        Delimiter::Comma => ',',
        // trailing \r is removed by trim
        Delimiter::Newline => '\n',
    };
    text.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// First URL-looking substring with an allowed scheme, defaulting to `http://`
pub fn extract_link(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let caps = URL_RE.captures(text)?;
    let scheme = caps.name("scheme").map(|m| m.as_str());
    if !ALLOWED_SCHEMES.contains(&scheme) {
        return None;
    }
    let link = caps.get(0)?.as_str();
    if link.starts_with("http://") || link.starts_with("https://") {
        Some(link.to_string())
    } else {
        Some(format!("http://{}", link))
    }
}

/// Loose truthiness: null, false, zero and empty strings, arrays or objects are false
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn split_list_input(
    field: &str,
    field_type: FieldType,
    value: &Value,
    delimiter: Delimiter,
) -> Result<Vec<String>, FieldError> {
    match value {
        Value::String(s) => Ok(split_input(s, delimiter)),
        Value::Array(items) => Ok(items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| stringify(item).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        other => Err(FieldError::bad_value(field, field_type, other)),
    }
}

fn is_empty_input(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn format_int(field: &str, value: &Value) -> Result<FieldValue, FieldError> {
    let bad = || FieldError::bad_value(field, FieldType::Int, value);
    match value {
        Value::String(s) if s.is_empty() => Ok(FieldValue::Null),
        Value::String(s) => s.trim().parse().map(FieldValue::Int).map_err(|_| bad()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Int(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(FieldValue::Int(f as i64))
                    }
                    _ => Err(bad()),
                }
            }
        }
        _ => Err(bad()),
    }
}

/// Format a raw submitted value according to the field's type tag.
///
/// `empty_default` is written as a one-element list when a list field is
/// cleared with an empty value.
pub fn format_field_value(
    field: &str,
    field_type: FieldType,
    value: &Value,
    empty_default: Option<&str>,
) -> Result<FieldValue, FieldError> {
    if value.is_null() {
        return Ok(FieldValue::Null);
    }

    match field_type {
        FieldType::Emails | FieldType::SplitStr => {
            let items = split_list_input(field, field_type, value, Delimiter::Comma)?;
            match empty_default {
                Some(sentinel) if is_empty_input(value) => {
                    Ok(FieldValue::List(vec![sentinel.to_string()]))
                }
                _ => Ok(FieldValue::List(items)),
            }
        }
        FieldType::Link => {
            if !truthy(value) {
                return Ok(FieldValue::Null);
            }
            Ok(extract_link(&stringify(value))
                .map(FieldValue::Str)
                .unwrap_or(FieldValue::Null))
        }
        FieldType::Links => {
            let items = split_list_input(field, field_type, value, Delimiter::Newline)?;
            Ok(FieldValue::List(
                items.iter().filter_map(|s| extract_link(s)).collect(),
            ))
        }
        FieldType::Int => format_int(field, value),
        FieldType::Bool => Ok(FieldValue::Bool(truthy(value))),
        FieldType::Str => Ok(FieldValue::Str(stringify(value))),
    }
}
