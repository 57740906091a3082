//! Single-rule inbound validation stage

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::context::Bucket;
use crate::core::diagnostics::{DiagLevel, Diagnostics, TracingDiagnostics};
use crate::core::error::{ConfigurationError, PipelineError, ValidationFailure};
use crate::core::RequestContext;
use crate::dto::DataObject;
use crate::schema::{SchemaFactory, ValidateOptions};

use super::{Stage, StageFlow};

/// Name DataObjects are attached under when no other name is configured.
pub const DEFAULT_ATTACH_NAME: &str = "dto";

/// What a passing rule produced: the sanitized bucket value and a fresh
/// DataObject built from it.
pub(crate) struct RuleOutcome {
    pub(crate) sanitized: Value,
    pub(crate) dto: DataObject,
}

/// Run one validation rule against a context bucket.
///
/// The schema factory resolves first; `None` is broken wiring. The bucket
/// value is then projected into a DataObject (non-objects are broken wiring
/// too, the transport never produces them) and validated. A failing
/// validation carries the ordered field errors.
pub(crate) fn evaluate_rule(
    object_name: &str,
    factory: &SchemaFactory,
    source: Bucket,
    options: ValidateOptions,
    ctx: &RequestContext,
) -> Result<RuleOutcome, PipelineError> {
    let Some(schema) = factory() else {
        return Err(ConfigurationError::SchemaNotFound {
            object: object_name.to_string(),
        }
        .into());
    };

    let mut dto = DataObject::from_value(object_name, ctx.bucket(source), Some(schema.clone()))
        .map_err(|e| ConfigurationError::InvalidSource {
            object: object_name.to_string(),
            bucket: source,
            message: e.to_string(),
        })?;

    let outcome = dto
        .validate_with(options)
        .map_err(|_| ConfigurationError::SchemaNotFound {
            object: object_name.to_string(),
        })?
        .clone();

    if !outcome.is_valid {
        return Err(ValidationFailure::fields(object_name, source, outcome.errors).into());
    }

    let dto = DataObject::from_value(object_name, &outcome.value, Some(schema)).map_err(|e| {
        ConfigurationError::InvalidSource {
            object: object_name.to_string(),
            bucket: source,
            message: e.to_string(),
        }
    })?;

    Ok(RuleOutcome {
        sanitized: outcome.value,
        dto,
    })
}

/// Report a rule failure to the diagnostics sink with caller metadata.
pub(crate) fn report_failure(
    diagnostics: &Arc<dyn Diagnostics>,
    ctx: &RequestContext,
    object_name: &str,
    source: Bucket,
    err: &PipelineError,
) {
    let meta = ctx.meta();
    match err {
        PipelineError::Validation(ValidationFailure::Fields { errors, .. }) => {
            let fields: Vec<String> = errors.iter().map(|e| e.dotted_path()).collect();
            diagnostics.record(
                DiagLevel::Warn,
                "request validation failed",
                &json!({
                    "endpoint": meta.endpoint,
                    "method": meta.method,
                    "bucket": source.as_str(),
                    "object": object_name,
                    "fields": fields,
                    "errors": serde_json::to_value(errors).unwrap_or(Value::Null),
                    "caller_ip": meta.caller_ip,
                    "user_agent": meta.user_agent,
                }),
            );
        }
        other => {
            diagnostics.record(
                DiagLevel::Error,
                "validation stage misconfigured",
                &json!({
                    "endpoint": meta.endpoint,
                    "method": meta.method,
                    "bucket": source.as_str(),
                    "object": object_name,
                    "error": other.to_string(),
                }),
            );
        }
    }
}

/// Validates one bucket against one schema and attaches the resulting
/// DataObject.
///
/// On success the sanitized value replaces the bucket. On failure the
/// pipeline halts with a 400-class error whose message is the field messages
/// joined by `", "`; wiring problems halt with a 500-class error instead.
pub struct ValidationStage {
    object_name: String,
    factory: SchemaFactory,
    source: Bucket,
    options: ValidateOptions,
    attach_dto: bool,
    attach_name: String,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ValidationStage {
    pub fn new(object_name: impl Into<String>, factory: SchemaFactory) -> Self {
        Self {
            object_name: object_name.into(),
            factory,
            source: Bucket::Body,
            options: ValidateOptions::default(),
            attach_dto: true,
            attach_name: DEFAULT_ATTACH_NAME.to_string(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Bucket to validate; body when not set.
    pub fn source(mut self, source: Bucket) -> Self {
        self.source = source;
        self
    }

    /// Validation options merged over the defaults by the caller.
    pub fn options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether to attach the sanitized DataObject onto the context.
    pub fn attach_dto(mut self, attach: bool) -> Self {
        self.attach_dto = attach;
        self
    }

    /// Context key the DataObject is attached under; `"dto"` when not set.
    pub fn attach_name(mut self, name: impl Into<String>) -> Self {
        self.attach_name = name.into();
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> StageFlow {
        match evaluate_rule(
            &self.object_name,
            &self.factory,
            self.source,
            self.options,
            ctx,
        ) {
            Ok(RuleOutcome { sanitized, dto }) => {
                ctx.set_bucket(self.source, sanitized);
                if self.attach_dto {
                    ctx.attach_object(self.attach_name.clone(), dto);
                }
                StageFlow::Continue
            }
            Err(err) => {
                report_failure(&self.diagnostics, ctx, &self.object_name, self.source, &err);
                StageFlow::Halt(err)
            }
        }
    }
}
