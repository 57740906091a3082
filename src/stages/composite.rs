//! Multi-rule validation stage
//!
//! Evaluates an ordered list of [`ValidationRule`]s against the context.
//! Rules are skipped, passed or failed independently, but the stage halts at
//! the first failure. Bucket replacement is immediate per passing rule, so a
//! later rule sees earlier rules' sanitized buckets; DataObject attachments
//! are held back and committed in one batch only after every rule passed, so
//! a failed run attaches nothing.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::RequestContext;
use crate::core::context::Bucket;
use crate::core::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::dto::DataObject;
use crate::schema::{SchemaFactory, ValidateOptions};

use super::validation::{DEFAULT_ATTACH_NAME, RuleOutcome, evaluate_rule, report_failure};
use super::{Stage, StageFlow};

/// Predicate deciding whether a rule runs for this request.
pub type RuleCondition = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// One rule of a [`CompositeValidationStage`].
pub struct ValidationRule {
    object_name: String,
    factory: SchemaFactory,
    source: Bucket,
    options: ValidateOptions,
    attach: bool,
    attach_name: String,
    condition: Option<RuleCondition>,
}

impl ValidationRule {
    pub fn new(object_name: impl Into<String>, factory: SchemaFactory) -> Self {
        Self {
            object_name: object_name.into(),
            factory,
            source: Bucket::Body,
            options: ValidateOptions::default(),
            attach: true,
            attach_name: DEFAULT_ATTACH_NAME.to_string(),
            condition: None,
        }
    }

    pub fn source(mut self, source: Bucket) -> Self {
        self.source = source;
        self
    }

    pub fn options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether this rule contributes a DataObject attachment.
    pub fn attach(mut self, attach: bool) -> Self {
        self.attach = attach;
        self
    }

    /// Attachment key; when two rules use the same key the later one wins.
    pub fn attach_name(mut self, name: impl Into<String>) -> Self {
        self.attach_name = name.into();
        self
    }

    /// Gate the rule on the context. A false condition skips the rule
    /// entirely; its schema factory is never invoked.
    pub fn when(
        mut self,
        condition: impl Fn(&RequestContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }
}

/// Ordered, fail-fast list of validation rules.
pub struct CompositeValidationStage {
    rules: Vec<ValidationRule>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl CompositeValidationStage {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Append a rule; rules evaluate in the order they were added.
    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for CompositeValidationStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for CompositeValidationStage {
    fn name(&self) -> &str {
        "composite_validation"
    }

    async fn apply(&self, ctx: &mut RequestContext) -> StageFlow {
        let mut attachments: Vec<(String, DataObject)> = Vec::new();

        for rule in &self.rules {
            if let Some(condition) = &rule.condition {
                if !condition(ctx) {
                    continue;
                }
            }

            match evaluate_rule(
                &rule.object_name,
                &rule.factory,
                rule.source,
                rule.options,
                ctx,
            ) {
                Ok(RuleOutcome { sanitized, dto }) => {
                    ctx.set_bucket(rule.source, sanitized);
                    if rule.attach {
                        attachments.push((rule.attach_name.clone(), dto));
                    }
                }
                Err(err) => {
                    report_failure(&self.diagnostics, ctx, &rule.object_name, rule.source, &err);
                    return StageFlow::Halt(err);
                }
            }
        }

        for (name, dto) in attachments {
            ctx.attach_object(name, dto);
        }
        StageFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RequestMeta;
    use crate::schema::{FieldSchema, Rule, Schema};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn body_schema() -> Schema {
        Schema::builder()
            .field(
                "title",
                FieldSchema::new().required().rule(Rule::Text).rule(Rule::NonEmpty),
            )
            .build()
    }

    fn params_schema() -> Schema {
        Schema::builder()
            .field("id", FieldSchema::new().required().rule(Rule::UuidFormat))
            .build()
    }

    /// Factory that counts invocations before delegating.
    fn counting_factory(schema: Schema, calls: Arc<AtomicUsize>) -> SchemaFactory {
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(schema.clone())
        })
    }

    fn artwork_context() -> RequestContext {
        RequestContext::new(RequestMeta::new("PUT", "/artworks/{id}"))
            .with_body(json!({"title": "Nocturne", "junk": 1}))
            .with_params(json!({"id": "550e8400-e29b-41d4-a716-446655440000"}))
    }

    #[tokio::test]
    async fn test_all_rules_pass_buckets_replaced_and_dtos_committed() {
        let stage = CompositeValidationStage::new()
            .rule(
                ValidationRule::new("ArtworkParams", crate::schema::fixed_factory(params_schema()))
                    .source(Bucket::Params)
                    .attach_name("params_dto"),
            )
            .rule(
                ValidationRule::new("ArtworkUpdate", crate::schema::fixed_factory(body_schema()))
                    .attach_name("artwork_dto"),
            );

        let mut ctx = artwork_context();
        let flow = stage.apply(&mut ctx).await;
        assert!(flow.is_continue());

        assert!(ctx.body().get("junk").is_none());
        assert!(ctx.object("params_dto").is_some());
        assert!(ctx.object("artwork_dto").is_some());
    }

    #[tokio::test]
    async fn test_false_condition_skips_without_invoking_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = CompositeValidationStage::new()
            .rule(
                ValidationRule::new("Skipped", counting_factory(body_schema(), calls.clone()))
                    .when(|_| false),
            )
            .rule(ValidationRule::new(
                "ArtworkUpdate",
                crate::schema::fixed_factory(body_schema()),
            ));

        let mut ctx = artwork_context();
        let flow = stage.apply(&mut ctx).await;
        assert!(flow.is_continue());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ctx.object("dto").is_some());
        assert_eq!(ctx.objects().len(), 1);
    }

    #[tokio::test]
    async fn test_true_condition_runs_the_rule() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = CompositeValidationStage::new().rule(
            ValidationRule::new("ArtworkUpdate", counting_factory(body_schema(), calls.clone()))
                .when(|ctx| ctx.meta().method == "PUT"),
        );

        let mut ctx = artwork_context();
        let flow = stage.apply(&mut ctx).await;
        assert!(flow.is_continue());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_later_factories_and_commits_no_dtos() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let stage = CompositeValidationStage::new()
            .rule(
                ValidationRule::new("ArtworkParams", crate::schema::fixed_factory(params_schema()))
                    .source(Bucket::Params)
                    .attach_name("params_dto"),
            )
            .rule(ValidationRule::new(
                "ArtworkUpdate",
                crate::schema::fixed_factory(body_schema()),
            ))
            .rule(ValidationRule::new(
                "NeverReached",
                counting_factory(body_schema(), later_calls.clone()),
            ));

        let mut ctx = artwork_context();
        ctx.set_bucket(Bucket::Body, json!({"title": ""}));

        let StageFlow::Halt(err) = stage.apply(&mut ctx).await else {
            panic!("should halt");
        };

        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(err.to_string().contains("'title'"));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);

        // rule 1 already replaced its bucket; its attachment was not committed
        assert_eq!(
            ctx.params()["id"],
            json!("550e8400-e29b-41d4-a716-446655440000")
        );
        assert!(ctx.objects().is_empty());
    }

    #[tokio::test]
    async fn test_earlier_bucket_replacement_persists_after_failure() {
        let stage = CompositeValidationStage::new()
            .rule(
                ValidationRule::new("ArtworkParams", crate::schema::fixed_factory(params_schema()))
                    .source(Bucket::Params),
            )
            .rule(ValidationRule::new(
                "ArtworkUpdate",
                crate::schema::fixed_factory(body_schema()),
            ));

        let mut ctx = artwork_context();
        ctx.set_bucket(
            Bucket::Params,
            json!({"id": "550e8400-e29b-41d4-a716-446655440000", "extra": "x"}),
        );
        ctx.set_bucket(Bucket::Body, json!({"title": 42}));

        let StageFlow::Halt(_) = stage.apply(&mut ctx).await else {
            panic!("should halt");
        };

        // params was sanitized by the passing first rule and stays sanitized
        assert!(ctx.params().get("extra").is_none());
    }

    #[tokio::test]
    async fn test_rule_without_attach_contributes_nothing() {
        let stage = CompositeValidationStage::new().rule(
            ValidationRule::new("ArtworkUpdate", crate::schema::fixed_factory(body_schema()))
                .attach(false),
        );

        let mut ctx = artwork_context();
        let flow = stage.apply(&mut ctx).await;
        assert!(flow.is_continue());
        assert!(ctx.objects().is_empty());
    }

    #[tokio::test]
    async fn test_same_attach_name_later_rule_wins() {
        let first = Schema::builder()
            .field("title", FieldSchema::new().required().rule(Rule::Text))
            .build();
        let second = Schema::builder()
            .field("id", FieldSchema::new().required().rule(Rule::UuidFormat))
            .build();

        let stage = CompositeValidationStage::new()
            .rule(ValidationRule::new("First", crate::schema::fixed_factory(first)))
            .rule(
                ValidationRule::new("Second", crate::schema::fixed_factory(second))
                    .source(Bucket::Params),
            );

        let mut ctx = artwork_context();
        let flow = stage.apply(&mut ctx).await;
        assert!(flow.is_continue());

        assert_eq!(ctx.objects().len(), 1);
        assert_eq!(ctx.object("dto").expect("dto").name(), "Second");
    }
}
