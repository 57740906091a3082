//! Typed error handling for the validation pipeline
//!
//! Every failure a stage can produce funnels into [`PipelineError`], so
//! callers can match on the category instead of parsing strings.
//!
//! # Error Categories
//!
//! - [`ValidationFailure`]: the caller's payload failed schema validation (400)
//! - [`ConfigurationError`]: the route wiring is broken, never the caller's
//!   fault (500)
//! - [`AttachmentError`]: an uploaded file violated a structural constraint (400)
//! - [`ResponseContractError`]: an outbound payload failed its response
//!   schema; surfaces as a replaced body, not a status change

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

use crate::core::context::Bucket;
use crate::core::envelope::ErrorEnvelope;
use crate::schema::FieldError;

/// The error type carried by a halted pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Caller payload failed schema validation
    Validation(ValidationFailure),

    /// Broken wiring: missing schema, unusable source bucket
    Configuration(ConfigurationError),

    /// Uploaded file violated a structural constraint
    Attachment(AttachmentError),

    /// Outbound payload failed its response schema
    ResponseContract(ResponseContractError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Validation(e) => write!(f, "{}", e),
            PipelineError::Configuration(e) => write!(f, "{}", e),
            PipelineError::Attachment(e) => write!(f, "{}", e),
            PipelineError::ResponseContract(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Validation(e) => Some(e),
            PipelineError::Configuration(e) => Some(e),
            PipelineError::Attachment(e) => Some(e),
            PipelineError::ResponseContract(e) => Some(e),
        }
    }
}

impl PipelineError {
    /// HTTP status for this error. Caller-input failures map to 400-class,
    /// wiring failures to 500-class.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Attachment(_) => StatusCode::BAD_REQUEST,
            PipelineError::ResponseContract(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Validation(ValidationFailure::Fields { .. }) => "VALIDATION_FAILED",
            PipelineError::Validation(ValidationFailure::MalformedJson { .. }) => "INVALID_JSON",
            PipelineError::Configuration(ConfigurationError::SchemaNotFound { .. }) => {
                "SCHEMA_NOT_FOUND"
            }
            PipelineError::Configuration(ConfigurationError::InvalidSource { .. }) => {
                "INVALID_SOURCE"
            }
            PipelineError::Configuration(ConfigurationError::Settings { .. }) => "SETTINGS_ERROR",
            PipelineError::Attachment(AttachmentError::Missing) => "ATTACHMENT_REQUIRED",
            PipelineError::Attachment(AttachmentError::TooLarge { .. }) => "ATTACHMENT_TOO_LARGE",
            PipelineError::Attachment(AttachmentError::UnsupportedType { .. }) => {
                "ATTACHMENT_TYPE_NOT_ALLOWED"
            }
            PipelineError::Attachment(AttachmentError::TooMany { .. }) => {
                "ATTACHMENT_COUNT_EXCEEDED"
            }
            PipelineError::ResponseContract(_) => "RESPONSE_CONTRACT",
        }
    }

    /// Per-field errors, for the categories that collect them.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            PipelineError::Validation(ValidationFailure::Fields { errors, .. }) => Some(errors),
            PipelineError::ResponseContract(ResponseContractError::Mismatch {
                errors, ..
            }) => Some(errors),
            _ => None,
        }
    }

    /// Build the error envelope sent to the caller. Field validation
    /// failures carry the structured per-field list alongside the joined
    /// message.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.to_string());
        match self {
            PipelineError::Validation(ValidationFailure::Fields { errors, .. }) => {
                envelope.with_field_errors(errors.clone())
            }
            _ => envelope,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_envelope());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Failures
// =============================================================================

/// Caller-input failures: the payload did not satisfy its schema.
#[derive(Debug)]
pub enum ValidationFailure {
    /// One or more fields failed; `errors` is ordered by schema declaration
    Fields {
        object: String,
        bucket: Bucket,
        errors: Vec<FieldError>,
    },

    /// The request body was present but not parseable JSON
    MalformedJson { message: String },
}

impl ValidationFailure {
    pub fn fields(object: impl Into<String>, bucket: Bucket, errors: Vec<FieldError>) -> Self {
        ValidationFailure::Fields {
            object: object.into(),
            bucket,
            errors,
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::Fields { errors, .. } => {
                let joined = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}", joined)
            }
            ValidationFailure::MalformedJson { message } => {
                write!(f, "invalid JSON body: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationFailure {}

impl From<ValidationFailure> for PipelineError {
    fn from(err: ValidationFailure) -> Self {
        PipelineError::Validation(err)
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Wiring failures. These are programmer mistakes and map to 500 so they are
/// never mistaken for bad caller input.
#[derive(Debug)]
pub enum ConfigurationError {
    /// The schema factory resolved no schema for the stage's object
    SchemaNotFound { object: String },

    /// The source bucket held something a DataObject cannot be built from
    InvalidSource {
        object: String,
        bucket: Bucket,
        message: String,
    },

    /// Pipeline settings could not be loaded
    Settings { message: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::SchemaNotFound { object } => {
                write!(f, "no schema registered for '{}'", object)
            }
            ConfigurationError::InvalidSource {
                object,
                bucket,
                message,
            } => {
                write!(f, "cannot build '{}' from {}: {}", object, bucket, message)
            }
            ConfigurationError::Settings { message } => {
                write!(f, "invalid pipeline settings: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<ConfigurationError> for PipelineError {
    fn from(err: ConfigurationError) -> Self {
        PipelineError::Configuration(err)
    }
}

// =============================================================================
// Attachment Errors
// =============================================================================

/// Structural violations of uploaded-file constraints.
#[derive(Debug)]
pub enum AttachmentError {
    /// An attachment was required and none was present
    Missing,

    /// A file exceeded the size limit
    TooLarge {
        file: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    /// A file's MIME type is not in the allowed set
    UnsupportedType {
        file: String,
        mime_type: String,
        allowed: Vec<String>,
    },

    /// The collection exceeded the item limit
    TooMany { count: usize, limit: usize },
}

impl fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentError::Missing => write!(f, "attachment is required"),
            AttachmentError::TooLarge {
                file, limit_bytes, ..
            } => {
                write!(
                    f,
                    "file '{}' exceeds maximum size of {}MB",
                    file,
                    limit_bytes / (1024 * 1024)
                )
            }
            AttachmentError::UnsupportedType {
                file,
                mime_type,
                allowed,
            } => {
                write!(
                    f,
                    "file '{}' has unsupported type '{}', allowed types: {}",
                    file,
                    mime_type,
                    allowed.join(", ")
                )
            }
            AttachmentError::TooMany { count, limit } => {
                write!(f, "too many attachments: {} exceeds limit of {}", count, limit)
            }
        }
    }
}

impl std::error::Error for AttachmentError {}

impl From<AttachmentError> for PipelineError {
    fn from(err: AttachmentError) -> Self {
        PipelineError::Attachment(err)
    }
}

// =============================================================================
// Response Contract Errors
// =============================================================================

/// An outbound payload failed its response schema. The guarded sink replaces
/// the body with this error's envelope; the transport status is untouched.
#[derive(Debug)]
pub enum ResponseContractError {
    Mismatch {
        endpoint: String,
        errors: Vec<FieldError>,
    },
}

impl fmt::Display for ResponseContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseContractError::Mismatch { endpoint, .. } => {
                write!(f, "response failed validation for {}", endpoint)
            }
        }
    }
}

impl std::error::Error for ResponseContractError {}

impl From<ResponseContractError> for PipelineError {
    fn from(err: ResponseContractError) -> Self {
        PipelineError::ResponseContract(err)
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// Specialized Result for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_field_errors() -> Vec<FieldError> {
        vec![
            FieldError::new(
                vec!["username".to_string()],
                "'username' must be at least 3 characters (currently: 2)",
            ),
            FieldError::new(vec!["password".to_string()], "'password' must not be empty"),
        ]
    }

    #[test]
    fn test_validation_failure_joins_messages() {
        let err = PipelineError::Validation(ValidationFailure::fields(
            "UserCreate",
            Bucket::Body,
            sample_field_errors(),
        ));
        let display = err.to_string();
        assert!(display.contains("'username' must be at least 3 characters"));
        assert!(display.contains(", 'password' must not be empty"));
    }

    #[test]
    fn test_validation_failure_status_and_code() {
        let err = PipelineError::Validation(ValidationFailure::fields(
            "UserCreate",
            Bucket::Body,
            sample_field_errors(),
        ));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field_errors().expect("field errors").len(), 2);
    }

    #[test]
    fn test_configuration_error_is_500() {
        let err = PipelineError::Configuration(ConfigurationError::SchemaNotFound {
            object: "CommentLogin".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "SCHEMA_NOT_FOUND");
        assert!(err.to_string().contains("CommentLogin"));
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_invalid_source_display_names_bucket() {
        let err = ConfigurationError::InvalidSource {
            object: "ArtworkCreate".to_string(),
            bucket: Bucket::Query,
            message: "payload is an array".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("ArtworkCreate"));
        assert!(display.contains("query"));
    }

    #[test]
    fn test_attachment_too_large_names_whole_megabytes() {
        let err = AttachmentError::TooLarge {
            file: "photo.png".to_string(),
            size_bytes: 11 * 1024 * 1024,
            limit_bytes: 10 * 1024 * 1024,
        };
        assert_eq!(
            err.to_string(),
            "file 'photo.png' exceeds maximum size of 10MB"
        );
    }

    #[test]
    fn test_attachment_type_lists_allowed() {
        let err = AttachmentError::UnsupportedType {
            file: "notes.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            allowed: vec!["image/jpeg".to_string(), "image/png".to_string()],
        };
        let display = err.to_string();
        assert!(display.contains("application/pdf"));
        assert!(display.contains("image/jpeg, image/png"));
    }

    #[test]
    fn test_attachment_errors_are_400() {
        assert_eq!(
            PipelineError::Attachment(AttachmentError::Missing).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::Attachment(AttachmentError::TooMany { count: 11, limit: 10 })
                .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_envelope_carries_field_errors_for_validation() {
        let err = PipelineError::Validation(ValidationFailure::fields(
            "UserCreate",
            Bucket::Body,
            sample_field_errors(),
        ));
        let value = err.to_envelope().to_value();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["data"], json!(null));
        assert_eq!(value["errors"].as_array().expect("errors").len(), 2);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_envelope_omits_field_errors_for_other_categories() {
        let err = PipelineError::Attachment(AttachmentError::Missing);
        let value = err.to_envelope().to_value();
        assert_eq!(value["error"], json!("attachment is required"));
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn test_response_contract_display() {
        let err = PipelineError::ResponseContract(ResponseContractError::Mismatch {
            endpoint: "/artworks".to_string(),
            errors: sample_field_errors(),
        });
        assert!(err.to_string().contains("/artworks"));
        assert_eq!(err.error_code(), "RESPONSE_CONTRACT");
    }

    #[test]
    fn test_conversion_from_sub_errors() {
        let err: PipelineError = AttachmentError::Missing.into();
        assert_eq!(err.error_code(), "ATTACHMENT_REQUIRED");

        let err: PipelineError = ConfigurationError::Settings {
            message: "bad yaml".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "SETTINGS_ERROR");
    }
}
