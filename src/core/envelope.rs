//! Uniform success and error payload wrappers
//!
//! Every outbound payload is wrapped in one of two envelope shapes:
//!
//! - success: `{"success": true, "data": ..., "message"?: ...}`
//! - error:   `{"success": false, "error": ..., "message"?: ..., "data": null,
//!   "timestamp": ...}` plus, for field validation failures, an `errors`
//!   array for programmatic consumers.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::schema::FieldError;

/// Wrapper for successful payloads.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub success: bool,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessEnvelope {
    pub fn new(data: Value) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Wrapper for failed requests. `data` is always null and `timestamp` is the
/// moment the envelope was built, in RFC 3339 form.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            data: Value::Null,
            timestamp: Utc::now().to_rfc3339(),
            errors: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// True when the value is a `{success: true, data: ...}` envelope.
pub fn is_success_envelope(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object.get("success") == Some(&Value::Bool(true)) && object.contains_key("data")
}
