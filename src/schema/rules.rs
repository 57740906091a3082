//! Field rules and value transforms
//!
//! Rules check one field value and report a message naming the field path.
//! Constraint rules let values of the wrong type pass through; a type rule
//! placed earlier in the field's rule list catches those.

use regex::Regex;
use serde_json::{Value, json};
use std::sync::OnceLock;
use uuid::Uuid;

use super::{FieldSchema, Schema};

/// Plain-function escape hatch for one-off checks.
pub type CustomCheck = fn(&str, &Value) -> Result<(), String>;

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex is valid")
    })
}

fn url_regex() -> &'static Regex {
    URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("url regex is valid")
    })
}

/// Declarative check applied to a single field value.
///
/// `Nested` and `Items` are structural: the schema walker descends into them
/// and `check` treats them as always passing.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Value must be a string
    Text,
    /// Value must be an integer (floats rejected)
    Integer,
    /// Value must be a number
    Number,
    /// Value must be a boolean
    Boolean,
    /// Value must be a JSON object
    Object,
    /// Value must be a JSON array
    Array,
    /// String must contain at least one non-whitespace character
    NonEmpty,
    /// String length lower bound, in bytes
    MinLength(usize),
    /// String length upper bound, in bytes
    MaxLength(usize),
    /// String must match the compiled pattern
    Pattern(Regex),
    /// String must look like an email address
    Email,
    /// String must look like an http(s) URL
    Url,
    /// String must parse as a UUID
    UuidFormat,
    /// String must be a calendar date in `YYYY-MM-DD` form
    IsoDate,
    /// String must be one of the allowed values
    OneOf(Vec<String>),
    /// Numeric lower bound (inclusive)
    Min(f64),
    /// Numeric upper bound (inclusive)
    Max(f64),
    /// Number must be strictly greater than zero
    Positive,
    /// Array length lower bound
    MinItems(usize),
    /// Array length upper bound
    MaxItems(usize),
    /// Object value validated against a sub-schema; error paths are prefixed
    Nested(Schema),
    /// Every array element validated against the given field description
    Items(Box<FieldSchema>),
    /// One-off check
    Custom(CustomCheck),
}

impl Rule {
    /// Check `value` against this rule, naming `path` in any message.
    pub fn check(&self, path: &str, value: &Value) -> Result<(), String> {
        match self {
            Rule::Text => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be a string", path))
                }
            }
            Rule::Integer => {
                if value.as_i64().is_some() || value.as_u64().is_some() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be an integer", path))
                }
            }
            Rule::Number => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be a number", path))
                }
            }
            Rule::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be a boolean", path))
                }
            }
            Rule::Object => {
                if value.is_object() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be an object", path))
                }
            }
            Rule::Array => {
                if value.is_array() {
                    Ok(())
                } else {
                    Err(format!("'{}' must be an array", path))
                }
            }
            Rule::NonEmpty => {
                if let Some(s) = value.as_str() {
                    if s.trim().is_empty() {
                        Err(format!("'{}' must not be empty", path))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::MinLength(min) => {
                if let Some(s) = value.as_str() {
                    let len = s.len();
                    if len < *min {
                        Err(format!(
                            "'{}' must be at least {} characters (currently: {})",
                            path, min, len
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::MaxLength(max) => {
                if let Some(s) = value.as_str() {
                    let len = s.len();
                    if len > *max {
                        Err(format!(
                            "'{}' must not exceed {} characters (currently: {})",
                            path, max, len
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Pattern(pattern) => {
                if let Some(s) = value.as_str() {
                    if pattern.is_match(s) {
                        Ok(())
                    } else {
                        Err(format!("'{}' has an invalid format", path))
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Email => {
                if let Some(s) = value.as_str() {
                    if email_regex().is_match(s) {
                        Ok(())
                    } else {
                        Err(format!("'{}' must be a valid email address", path))
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Url => {
                if let Some(s) = value.as_str() {
                    if url_regex().is_match(s) {
                        Ok(())
                    } else {
                        Err(format!("'{}' must be a valid URL", path))
                    }
                } else {
                    Ok(())
                }
            }
            Rule::UuidFormat => {
                if let Some(s) = value.as_str() {
                    if Uuid::parse_str(s).is_ok() {
                        Ok(())
                    } else {
                        Err(format!("'{}' must be a valid UUID", path))
                    }
                } else {
                    Ok(())
                }
            }
            Rule::IsoDate => {
                if let Some(s) = value.as_str() {
                    match chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                        Ok(_) => Ok(()),
                        Err(_) => Err(format!(
                            "'{}' must be a date in YYYY-MM-DD format (currently: {})",
                            path, s
                        )),
                    }
                } else {
                    Ok(())
                }
            }
            Rule::OneOf(allowed) => {
                if let Some(s) = value.as_str() {
                    if allowed.iter().any(|a| a == s) {
                        Ok(())
                    } else {
                        Err(format!(
                            "'{}' must be one of: {} (currently: {})",
                            path,
                            allowed.join(", "),
                            s
                        ))
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Min(min) => {
                if let Some(num) = value.as_f64() {
                    if num < *min {
                        Err(format!(
                            "'{}' must be at least {} (currently: {})",
                            path, min, num
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Max(max) => {
                if let Some(num) = value.as_f64() {
                    if num > *max {
                        Err(format!(
                            "'{}' must not exceed {} (currently: {})",
                            path, max, num
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Positive => {
                if let Some(num) = value.as_f64() {
                    if num <= 0.0 {
                        Err(format!(
                            "'{}' must be positive (currently: {})",
                            path, num
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::MinItems(min) => {
                if let Some(items) = value.as_array() {
                    if items.len() < *min {
                        Err(format!(
                            "'{}' must contain at least {} items (currently: {})",
                            path,
                            min,
                            items.len()
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::MaxItems(max) => {
                if let Some(items) = value.as_array() {
                    if items.len() > *max {
                        Err(format!(
                            "'{}' must not contain more than {} items (currently: {})",
                            path,
                            max,
                            items.len()
                        ))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            Rule::Nested(_) | Rule::Items(_) => Ok(()),
            Rule::Custom(check) => check(path, value),
        }
    }
}

/// Value coercion applied before a field's rules run.
///
/// Transforms leave values of a non-matching type untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Trim whitespace from both ends of a string
    Trim,
    /// Convert a string to lowercase
    Lowercase,
    /// Convert a string to uppercase
    Uppercase,
    /// Round a number to the given decimal places
    RoundDecimals(u32),
}

impl Transform {
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Transform::Trim => {
                if let Some(s) = value.as_str() {
                    Value::String(s.trim().to_string())
                } else {
                    value
                }
            }
            Transform::Lowercase => {
                if let Some(s) = value.as_str() {
                    Value::String(s.to_lowercase())
                } else {
                    value
                }
            }
            Transform::Uppercase => {
                if let Some(s) = value.as_str() {
                    Value::String(s.to_uppercase())
                } else {
                    value
                }
            }
            Transform::RoundDecimals(decimals) => {
                if let Some(num) = value.as_f64() {
                    let factor = 10_f64.powi(*decimals as i32);
                    json!((num * factor).round() / factor)
                } else {
                    value
                }
            }
        }
    }
}
