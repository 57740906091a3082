//! Outbound response screening
//!
//! Validates outgoing payloads against a response schema before they reach
//! the client. The stage itself is request-independent configuration; each
//! response gets its own [`GuardedSink`] decorator wrapping the transport
//! sink, which screens the payload and guarantees the underlying send runs
//! at most once.
//!
//! A violating payload is replaced by a generic error envelope (unless the
//! stage is log-only); the transport status code is left alone, the
//! violation is recorded through diagnostics instead.

use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::{Environment, PipelineSettings};
use crate::core::diagnostics::{DiagLevel, Diagnostics, TracingDiagnostics};
use crate::core::error::{PipelineError, ResponseContractError};
use crate::core::is_success_envelope;
use crate::schema::Schema;

/// Destination a screened payload is delivered to.
pub trait ResponseSink {
    fn emit(&mut self, payload: Value);
}

/// Sink that holds the delivered payload in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    payload: Option<Value>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }
}

impl ResponseSink for BufferSink {
    fn emit(&mut self, payload: Value) {
        self.payload = Some(payload);
    }
}

/// Screening configuration shared across responses.
pub struct ResponseValidationStage {
    schema: Schema,
    enabled: bool,
    log_only: bool,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ResponseValidationStage {
    /// Screening defaults to on outside production.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            enabled: !Environment::from_env().is_production(),
            log_only: false,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn from_settings(schema: Schema, settings: &PipelineSettings) -> Self {
        Self::new(schema)
            .enabled(settings.response_validation_enabled())
            .log_only(settings.response_log_only)
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Record violations without replacing the payload.
    pub fn log_only(mut self, log_only: bool) -> Self {
        self.log_only = log_only;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Wrap a transport sink for one response.
    pub fn guard<S: ResponseSink>(&self, sink: S, endpoint: impl Into<String>) -> GuardedSink<S> {
        GuardedSink {
            inner: sink,
            schema: self.schema.clone(),
            enabled: self.enabled,
            log_only: self.log_only,
            diagnostics: self.diagnostics.clone(),
            endpoint: endpoint.into(),
            emitted: false,
        }
    }
}

/// Per-response decorator around a [`ResponseSink`].
pub struct GuardedSink<S: ResponseSink> {
    inner: S,
    schema: Schema,
    enabled: bool,
    log_only: bool,
    diagnostics: Arc<dyn Diagnostics>,
    endpoint: String,
    emitted: bool,
}

impl<S: ResponseSink> GuardedSink<S> {
    pub fn has_emitted(&self) -> bool {
        self.emitted
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Validate the payload, screening the `data` member when the payload is
    /// a success envelope and the whole payload otherwise. The original
    /// payload is returned untouched when it passes; sanitization never
    /// applies to responses.
    fn screen(&self, payload: Value) -> Value {
        let target = if is_success_envelope(&payload) {
            &payload["data"]
        } else {
            &payload
        };

        let outcome = self.schema.validate(target);
        if outcome.is_valid {
            return payload;
        }

        self.diagnostics.record(
            DiagLevel::Error,
            "response contract violation",
            &json!({
                "endpoint": self.endpoint,
                "errors": outcome.errors,
                "payload": payload,
            }),
        );

        if self.log_only {
            return payload;
        }

        let err = PipelineError::ResponseContract(ResponseContractError::Mismatch {
            endpoint: self.endpoint.clone(),
            errors: outcome.errors,
        });
        err.to_envelope().to_value()
    }
}

impl<S: ResponseSink> ResponseSink for GuardedSink<S> {
    fn emit(&mut self, payload: Value) {
        if self.emitted {
            self.diagnostics.record(
                DiagLevel::Warn,
                "response already emitted",
                &json!({"endpoint": self.endpoint}),
            );
            return;
        }
        self.emitted = true;

        if !self.enabled {
            self.inner.emit(payload);
            return;
        }
        let screened = self.screen(payload);
        self.inner.emit(screened);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SuccessEnvelope;
    use crate::core::diagnostics::RecordingDiagnostics;
    use crate::schema::{FieldSchema, Rule};

    fn artwork_response_schema() -> Schema {
        Schema::builder()
            .field("id", FieldSchema::new().required().rule(Rule::UuidFormat))
            .field(
                "title",
                FieldSchema::new().required().rule(Rule::Text).rule(Rule::NonEmpty),
            )
            .build()
    }

    fn good_data() -> Value {
        json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "title": "Nocturne in Grey"
        })
    }

    // === screening ===

    #[test]
    fn test_valid_envelope_passes_through_unchanged() {
        let stage = ResponseValidationStage::new(artwork_response_schema()).enabled(true);
        let mut guard = stage.guard(BufferSink::new(), "/artworks/{id}");

        let payload = SuccessEnvelope::new(good_data()).to_value();
        guard.emit(payload.clone());

        assert_eq!(guard.into_inner().into_payload(), Some(payload));
    }

    #[test]
    fn test_violating_envelope_is_replaced() {
        let recorder = RecordingDiagnostics::new();
        let stage = ResponseValidationStage::new(artwork_response_schema())
            .enabled(true)
            .diagnostics(Arc::new(recorder.clone()));
        let mut guard = stage.guard(BufferSink::new(), "/artworks/{id}");

        guard.emit(SuccessEnvelope::new(json!({"id": "not-a-uuid"})).to_value());

        let delivered = guard.into_inner().into_payload().expect("should deliver");
        assert_eq!(delivered["success"], json!(false));
        assert_eq!(
            delivered["error"],
            json!("response failed validation for /artworks/{id}")
        );
        assert_eq!(delivered["data"], json!(null));
        assert!(delivered["timestamp"].is_string());

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, DiagLevel::Error);
        assert_eq!(records[0].meta["endpoint"], "/artworks/{id}");
        assert!(records[0].meta["errors"].as_array().is_some_and(|e| !e.is_empty()));
        assert_eq!(records[0].meta["payload"]["data"]["id"], "not-a-uuid");
    }

    #[test]
    fn test_non_envelope_payload_is_screened_whole() {
        let stage = ResponseValidationStage::new(artwork_response_schema()).enabled(true);

        let mut guard = stage.guard(BufferSink::new(), "/raw");
        guard.emit(good_data());
        assert_eq!(guard.into_inner().into_payload(), Some(good_data()));

        let mut guard = stage.guard(BufferSink::new(), "/raw");
        guard.emit(json!({"title": ""}));
        let delivered = guard.into_inner().into_payload().expect("should deliver");
        assert_eq!(delivered["success"], json!(false));
    }

    #[test]
    fn test_log_only_records_but_delivers_original() {
        let recorder = RecordingDiagnostics::new();
        let stage = ResponseValidationStage::new(artwork_response_schema())
            .enabled(true)
            .log_only(true)
            .diagnostics(Arc::new(recorder.clone()));
        let mut guard = stage.guard(BufferSink::new(), "/artworks/{id}");

        let payload = SuccessEnvelope::new(json!({"title": 7})).to_value();
        guard.emit(payload.clone());

        assert_eq!(guard.into_inner().into_payload(), Some(payload));
        assert_eq!(recorder.records().len(), 1);
    }

    #[test]
    fn test_disabled_stage_delivers_without_screening() {
        let recorder = RecordingDiagnostics::new();
        let stage = ResponseValidationStage::new(artwork_response_schema())
            .enabled(false)
            .diagnostics(Arc::new(recorder.clone()));
        let mut guard = stage.guard(BufferSink::new(), "/artworks/{id}");

        let payload = SuccessEnvelope::new(json!({"bogus": true})).to_value();
        guard.emit(payload.clone());

        assert_eq!(guard.into_inner().into_payload(), Some(payload));
        assert!(recorder.records().is_empty());
    }

    // === emission guard ===

    #[test]
    fn test_second_emit_is_ignored() {
        let recorder = RecordingDiagnostics::new();
        let stage = ResponseValidationStage::new(artwork_response_schema())
            .enabled(true)
            .diagnostics(Arc::new(recorder.clone()));
        let mut guard = stage.guard(BufferSink::new(), "/artworks/{id}");

        guard.emit(SuccessEnvelope::new(good_data()).to_value());
        guard.emit(SuccessEnvelope::new(json!({"second": true})).to_value());

        assert!(guard.has_emitted());
        let delivered = guard.into_inner().into_payload().expect("should deliver");
        assert_eq!(delivered["data"], good_data());

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, DiagLevel::Warn);
        assert_eq!(records[0].message, "response already emitted");
    }

    #[test]
    fn test_guards_do_not_share_emission_state() {
        let stage = ResponseValidationStage::new(artwork_response_schema()).enabled(true);

        let mut first = stage.guard(BufferSink::new(), "/a");
        let mut second = stage.guard(BufferSink::new(), "/b");

        first.emit(SuccessEnvelope::new(good_data()).to_value());
        assert!(first.has_emitted());
        assert!(!second.has_emitted());

        second.emit(SuccessEnvelope::new(good_data()).to_value());
        assert!(second.has_emitted());
    }

    #[test]
    fn test_from_settings_honors_toggles() {
        let settings = PipelineSettings {
            environment: Environment::Production,
            response_validation: Some(true),
            response_log_only: true,
            ..Default::default()
        };
        let stage = ResponseValidationStage::from_settings(artwork_response_schema(), &settings);
        assert!(stage.is_enabled());
        assert!(stage.log_only);
    }
}
