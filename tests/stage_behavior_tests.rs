//! Pipeline and stage behavior tests
//!
//! These tests exercise the stage machinery directly, without the HTTP
//! layer: halting order, composite commit semantics, lazy schema
//! resolution, catalog lookups, and what reaches the diagnostics sink.

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vernissage::core::ValidationFailure;
use vernissage::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn title_schema() -> Schema {
    Schema::builder()
        .field(
            "title",
            FieldSchema::new()
                .required()
                .rule(Rule::Text)
                .rule(Rule::NonEmpty),
        )
        .build()
}

fn id_schema() -> Schema {
    Schema::builder()
        .field("id", FieldSchema::new().required().rule(Rule::UuidFormat))
        .build()
}

/// Factory that counts how often the pipeline resolves it.
fn counting_factory(schema: Schema, calls: Arc<AtomicUsize>) -> SchemaFactory {
    Arc::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Some(schema.clone())
    })
}

/// Stage that appends its tag to a shared trace and optionally halts.
struct TraceStage {
    tag: &'static str,
    trace: Arc<std::sync::Mutex<Vec<&'static str>>>,
    halt: bool,
}

#[async_trait]
impl Stage for TraceStage {
    fn name(&self) -> &str {
        self.tag
    }

    async fn apply(&self, _ctx: &mut RequestContext) -> StageFlow {
        self.trace.lock().expect("trace lock").push(self.tag);
        if self.halt {
            StageFlow::Halt(PipelineError::Validation(
                ValidationFailure::MalformedJson {
                    message: "halted".to_string(),
                },
            ))
        } else {
            StageFlow::Continue
        }
    }
}

fn put_context() -> RequestContext {
    RequestContext::new(RequestMeta::new("PUT", "/artworks/{id}"))
        .with_body(json!({"title": "Nocturne"}))
        .with_params(json!({"id": "550e8400-e29b-41d4-a716-446655440000"}))
}

// =============================================================================
// Pipeline flow
// =============================================================================

mod pipeline_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_stages_run_in_declaration_order() {
        let trace = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pipeline = StagePipeline::new()
            .stage(TraceStage { tag: "first", trace: trace.clone(), halt: false })
            .stage(TraceStage { tag: "second", trace: trace.clone(), halt: false })
            .stage(TraceStage { tag: "third", trace: trace.clone(), halt: false });

        let mut ctx = put_context();
        pipeline.run(&mut ctx).await.expect("should pass");

        assert_eq!(*trace.lock().expect("trace lock"), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_halt_stops_later_stages() {
        let trace = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pipeline = StagePipeline::new()
            .stage(TraceStage { tag: "first", trace: trace.clone(), halt: true })
            .stage(TraceStage { tag: "never", trace: trace.clone(), halt: false });

        let mut ctx = put_context();
        let err = pipeline.run(&mut ctx).await.expect_err("should halt");

        assert_eq!(err.error_code(), "INVALID_JSON");
        assert_eq!(*trace.lock().expect("trace lock"), vec!["first"]);
    }

    #[tokio::test]
    async fn test_validation_failure_surfaces_from_run() {
        let pipeline = StagePipeline::new()
            .stage(ValidationStage::new("Artwork", fixed_factory(title_schema())));

        let mut ctx = RequestContext::new(RequestMeta::new("POST", "/artworks"))
            .with_body(json!({"title": ""}));
        let err = pipeline.run(&mut ctx).await.expect_err("empty title");

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        let fields = err.field_errors().expect("field errors");
        assert_eq!(fields[0].path, vec!["title".to_string()]);
    }
}

// =============================================================================
// Composite commit semantics
// =============================================================================

mod composite_commit_tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_keeps_earlier_bucket_but_attaches_nothing() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let pipeline = StagePipeline::new().stage(
            CompositeValidationStage::new()
                .rule(
                    ValidationRule::new("IdParams", fixed_factory(id_schema()))
                        .source(Bucket::Params)
                        .attach_name("params"),
                )
                .rule(ValidationRule::new(
                    "Artwork",
                    fixed_factory(title_schema()),
                ))
                .rule(
                    ValidationRule::new(
                        "Never",
                        counting_factory(title_schema(), later_calls.clone()),
                    )
                    .attach_name("never"),
                ),
        );

        let mut ctx = RequestContext::new(RequestMeta::new("PUT", "/artworks/{id}"))
            .with_body(json!({"title": ""}))
            .with_params(json!({"id": "550e8400-e29b-41d4-a716-446655440000", "stray": "x"}));
        let err = pipeline.run(&mut ctx).await.expect_err("title is empty");

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        // the params rule already passed, so its sanitized bucket stays
        assert_eq!(
            ctx.bucket(Bucket::Params),
            &json!({"id": "550e8400-e29b-41d4-a716-446655440000"})
        );
        // no DTO from any rule, passing ones included
        assert!(ctx.objects().is_empty());
        // the rule after the failure never resolved its schema
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_conditional_rule_skips_without_resolving() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = StagePipeline::new().stage(
            CompositeValidationStage::new().rule(
                ValidationRule::new("Changes", counting_factory(title_schema(), calls.clone()))
                    .attach_name("changes")
                    .when(|ctx| ctx.body().as_object().is_some_and(|m| !m.is_empty())),
            ),
        );

        let mut ctx =
            RequestContext::new(RequestMeta::new("PUT", "/artworks/{id}")).with_body(json!({}));
        pipeline.run(&mut ctx).await.expect("skip is not a failure");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ctx.object("changes").is_none());
        assert_eq!(ctx.body(), &json!({}));
    }

    #[tokio::test]
    async fn test_all_rules_attach_after_the_last_passes() {
        let pipeline = StagePipeline::new().stage(
            CompositeValidationStage::new()
                .rule(
                    ValidationRule::new("IdParams", fixed_factory(id_schema()))
                        .source(Bucket::Params)
                        .attach_name("params"),
                )
                .rule(ValidationRule::new(
                    "Artwork",
                    fixed_factory(title_schema()),
                )),
        );

        let mut ctx = put_context();
        pipeline.run(&mut ctx).await.expect("both rules pass");

        assert!(ctx.object("params").is_some());
        assert!(ctx.object("dto").is_some());
        assert_eq!(ctx.objects().len(), 2);
    }
}

// =============================================================================
// Catalog
// =============================================================================

mod catalog_tests {
    use super::*;

    #[test]
    fn test_global_registry_is_one_instance() {
        assert!(std::ptr::eq(SchemaRegistry::global(), SchemaRegistry::global()));
    }

    #[test]
    fn test_every_catalog_pair_resolves() {
        let pairs = [
            (EntityKind::User, Intent::Create),
            (EntityKind::User, Intent::Update),
            (EntityKind::User, Intent::Login),
            (EntityKind::User, Intent::Response),
            (EntityKind::Artwork, Intent::Create),
            (EntityKind::Artwork, Intent::Update),
            (EntityKind::Artwork, Intent::Query),
            (EntityKind::Artwork, Intent::Response),
            (EntityKind::Exhibition, Intent::Create),
            (EntityKind::Exhibition, Intent::Update),
            (EntityKind::Exhibition, Intent::Query),
            (EntityKind::Exhibition, Intent::Response),
            (EntityKind::Comment, Intent::Create),
            (EntityKind::Comment, Intent::Response),
        ];

        for (kind, intent) in pairs {
            let factory = registry_factory(kind, intent);
            assert!(
                factory().is_some(),
                "({:?}, {:?}) should resolve",
                kind,
                intent
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_pair_halts_with_a_500() {
        assert!(registry_factory(EntityKind::Comment, Intent::Login)().is_none());

        let pipeline = StagePipeline::new().stage(ValidationStage::new(
            "CommentLogin",
            registry_factory(EntityKind::Comment, Intent::Login),
        ));

        let mut ctx = RequestContext::new(RequestMeta::new("POST", "/comments/login"))
            .with_body(json!({"anything": true}));
        let err = pipeline.run(&mut ctx).await.expect_err("not registered");

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "SCHEMA_NOT_FOUND");
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

mod diagnostics_tests {
    use super::*;

    #[tokio::test]
    async fn test_validation_failure_is_recorded_with_caller_metadata() {
        let recorder = RecordingDiagnostics::new();
        let pipeline = StagePipeline::new().stage(
            ValidationStage::new("Artwork", fixed_factory(title_schema()))
                .diagnostics(Arc::new(recorder.clone())),
        );

        let mut meta = RequestMeta::new("POST", "/artworks");
        meta.caller_ip = Some("203.0.113.7".to_string());
        let mut ctx = RequestContext::new(meta).with_body(json!({"title": 42}));
        pipeline.run(&mut ctx).await.expect_err("wrong type");

        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, DiagLevel::Warn);
        assert_eq!(records[0].message, "request validation failed");
        assert_eq!(records[0].meta["endpoint"], "/artworks");
        assert_eq!(records[0].meta["caller_ip"], "203.0.113.7");
        assert_eq!(records[0].meta["fields"], json!(["title"]));
    }

    #[tokio::test]
    async fn test_attachment_violation_is_recorded() {
        let recorder = RecordingDiagnostics::new();
        let pipeline = StagePipeline::new().stage(
            AttachmentConstraintStage::new()
                .max_size_bytes(1024)
                .diagnostics(Arc::new(recorder.clone())),
        );

        let mut ctx = RequestContext::new(RequestMeta::new("POST", "/artworks/{id}/image"));
        ctx.set_file(UploadedFile::new("image", "image/png", 4096, "big.png"));
        let err = pipeline.run(&mut ctx).await.expect_err("too large");

        assert_eq!(err.error_code(), "ATTACHMENT_TOO_LARGE");
        let records = recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "attachment constraint violated");
        assert_eq!(records[0].meta["endpoint"], "/artworks/{id}/image");
    }

    #[tokio::test]
    async fn test_passing_pipeline_records_nothing() {
        let recorder = RecordingDiagnostics::new();
        let pipeline = StagePipeline::new().stage(
            ValidationStage::new("Artwork", fixed_factory(title_schema()))
                .diagnostics(Arc::new(recorder.clone())),
        );

        let mut ctx = RequestContext::new(RequestMeta::new("POST", "/artworks"))
            .with_body(json!({"title": "Nocturne"}));
        pipeline.run(&mut ctx).await.expect("valid");

        assert!(recorder.is_empty());
    }
}

// =============================================================================
// Status taxonomy
// =============================================================================

mod status_taxonomy_tests {
    use super::*;
    use vernissage::core::{AttachmentError, ConfigurationError, ResponseContractError};

    #[test]
    fn test_client_mistakes_are_400() {
        let validation: PipelineError = ValidationFailure::MalformedJson {
            message: "truncated".to_string(),
        }
        .into();
        let attachment: PipelineError = AttachmentError::Missing.into();

        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(attachment.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_mistakes_are_500() {
        let configuration: PipelineError = ConfigurationError::SchemaNotFound {
            object: "ArtworkCreate".to_string(),
        }
        .into();
        let contract: PipelineError = ResponseContractError::Mismatch {
            endpoint: "/artworks".to_string(),
            errors: Vec::new(),
        }
        .into();

        assert_eq!(configuration.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(contract.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_every_error_envelope_has_the_same_shape() {
        let errors: Vec<PipelineError> = vec![
            ValidationFailure::MalformedJson { message: "bad".to_string() }.into(),
            AttachmentError::Missing.into(),
            ConfigurationError::SchemaNotFound { object: "X".to_string() }.into(),
        ];

        for err in errors {
            let value = err.to_envelope().to_value();
            assert_eq!(value["success"], json!(false));
            assert!(value["error"].is_string());
            assert_eq!(value["data"], Value::Null);
            assert!(value["timestamp"].is_string());
        }
    }
}
