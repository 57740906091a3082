//! Pipeline configuration
//!
//! Runtime settings for the validation pipeline: deployment environment,
//! response screening toggles and attachment limits. Settings come from
//! defaults, the process environment or a YAML document; stages consume
//! them through their `from_settings` constructors.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigurationError;
use crate::stages::attachment::{DEFAULT_MAX_COUNT, DEFAULT_MAX_SIZE_BYTES, default_allowed_types};

/// Deployment environment the pipeline runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Read the environment from `APP_ENV`; unset or unrecognized values
    /// fall back to development.
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV") {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::Development,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Complete settings for the validation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Force response screening on or off; unset follows the environment
    /// (enabled outside production)
    #[serde(default)]
    pub response_validation: Option<bool>,

    /// Record response contract violations without replacing the payload
    #[serde(default)]
    pub response_log_only: bool,

    /// Maximum size of a single uploaded file, in bytes
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,

    /// Accepted upload MIME types; an empty list accepts every type
    #[serde(default = "default_allowed_types")]
    pub allowed_attachment_types: Vec<String>,

    /// Maximum number of files in an upload collection
    #[serde(default = "default_max_attachment_count")]
    pub max_attachment_count: usize,

    /// Reject requests that carry no upload at all
    #[serde(default)]
    pub attachment_required: bool,
}

fn default_max_attachment_bytes() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

fn default_max_attachment_count() -> usize {
    DEFAULT_MAX_COUNT
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            response_validation: None,
            response_log_only: false,
            max_attachment_bytes: default_max_attachment_bytes(),
            allowed_attachment_types: default_allowed_types(),
            max_attachment_count: default_max_attachment_count(),
            attachment_required: false,
        }
    }
}

impl PipelineSettings {
    /// Default settings with the environment taken from `APP_ENV`.
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            ..Self::default()
        }
    }

    /// Load settings from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(yaml).map_err(|err| ConfigurationError::Settings {
            message: err.to_string(),
        })
    }

    /// Load settings from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigurationError::Settings {
            message: format!("cannot read '{}': {}", path, err),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Whether response screening is on: the explicit toggle when set,
    /// otherwise enabled everywhere except production.
    pub fn response_validation_enabled(&self) -> bool {
        self.response_validation
            .unwrap_or(!self.environment.is_production())
    }
}
