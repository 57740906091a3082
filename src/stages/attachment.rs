//! Upload constraint stage
//!
//! Enforces size, MIME type, count and presence constraints on the files
//! carried by the request context. Checks run in a fixed order: the single
//! file's size then type, the collection's count then each member's size and
//! type, and finally the required-presence check. The first violation halts
//! the pipeline.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::config::PipelineSettings;
use crate::core::diagnostics::{DiagLevel, Diagnostics, TracingDiagnostics};
use crate::core::error::AttachmentError;
use crate::core::{RequestContext, UploadedFile};

use super::{Stage, StageFlow};

pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_COUNT: usize = 10;

pub(crate) fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

pub struct AttachmentConstraintStage {
    max_size_bytes: u64,
    allowed_types: Vec<String>,
    max_count: usize,
    required: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl AttachmentConstraintStage {
    pub fn new() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            allowed_types: default_allowed_types(),
            max_count: DEFAULT_MAX_COUNT,
            required: false,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Build a stage from pipeline settings.
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new()
            .max_size_bytes(settings.max_attachment_bytes)
            .allowed_types(settings.allowed_attachment_types.clone())
            .max_count(settings.max_attachment_count)
            .required(settings.attachment_required)
    }

    pub fn max_size_bytes(mut self, limit: u64) -> Self {
        self.max_size_bytes = limit;
        self
    }

    /// Accepted MIME types. An empty list accepts every type.
    pub fn allowed_types(mut self, types: Vec<String>) -> Self {
        self.allowed_types = types;
        self
    }

    pub fn max_count(mut self, limit: usize) -> Self {
        self.max_count = limit;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    fn check_size(&self, file: &UploadedFile) -> Result<(), AttachmentError> {
        if file.size_bytes > self.max_size_bytes {
            return Err(AttachmentError::TooLarge {
                file: file.original_name.clone(),
                size_bytes: file.size_bytes,
                limit_bytes: self.max_size_bytes,
            });
        }
        Ok(())
    }

    fn check_type(&self, file: &UploadedFile) -> Result<(), AttachmentError> {
        if !self.allowed_types.is_empty()
            && !self.allowed_types.iter().any(|t| t == &file.mime_type)
        {
            return Err(AttachmentError::UnsupportedType {
                file: file.original_name.clone(),
                mime_type: file.mime_type.clone(),
                allowed: self.allowed_types.clone(),
            });
        }
        Ok(())
    }

    fn check(&self, ctx: &RequestContext) -> Result<(), AttachmentError> {
        if let Some(file) = ctx.file() {
            self.check_size(file)?;
            self.check_type(file)?;
        }

        if !ctx.files().is_empty() {
            if ctx.files().len() > self.max_count {
                return Err(AttachmentError::TooMany {
                    count: ctx.files().len(),
                    limit: self.max_count,
                });
            }
            for file in ctx.files() {
                self.check_size(file)?;
                self.check_type(file)?;
            }
        }

        if self.required && ctx.file().is_none() && ctx.files().is_empty() {
            return Err(AttachmentError::Missing);
        }
        Ok(())
    }
}

impl Default for AttachmentConstraintStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for AttachmentConstraintStage {
    fn name(&self) -> &str {
        "attachments"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> StageFlow {
        match self.check(ctx) {
            Ok(()) => StageFlow::Continue,
            Err(err) => {
                self.diagnostics.record(
                    DiagLevel::Warn,
                    "attachment constraint violated",
                    &json!({
                        "endpoint": ctx.meta().endpoint,
                        "method": ctx.meta().method,
                        "error": err.to_string(),
                    }),
                );
                StageFlow::Halt(err.into())
            }
        }
    }
}
