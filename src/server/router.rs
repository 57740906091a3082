//! Staged route helper
//!
//! Glues a [`StagePipeline`] in front of a handler. The produced closure is
//! itself an axum handler: it takes the extracted [`RequestContext`], runs
//! the pipeline over it, and only hands a surviving context to the inner
//! handler. A halted pipeline answers with the error envelope directly.

use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::core::RequestContext;
use crate::core::error::PipelineError;
use crate::stages::StagePipeline;

pub fn staged<H, Fut>(
    pipeline: StagePipeline,
    handler: H,
) -> impl Fn(RequestContext) -> Pin<Box<dyn Future<Output = Response> + Send>>
+ Clone
+ Send
+ Sync
+ 'static
where
    H: Fn(RequestContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, PipelineError>> + Send + 'static,
{
    let pipeline = Arc::new(pipeline);
    move |mut ctx: RequestContext| {
        let pipeline = pipeline.clone();
        let handler = handler.clone();
        Box::pin(async move {
            if let Err(err) = pipeline.run(&mut ctx).await {
                return err.into_response();
            }
            match handler(ctx).await {
                Ok(response) => response,
                Err(err) => err.into_response(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RequestMeta;
    use crate::schema::{FieldSchema, Rule, Schema, fixed_factory};
    use crate::server::respond;
    use crate::stages::ValidationStage;
    use serde_json::json;

    fn pipeline() -> StagePipeline {
        let schema = Schema::builder()
            .field(
                "title",
                FieldSchema::new().required().rule(Rule::Text).rule(Rule::NonEmpty),
            )
            .build();
        StagePipeline::new().stage(ValidationStage::new("Artwork", fixed_factory(schema)))
    }

    #[tokio::test]
    async fn test_surviving_context_reaches_the_handler() {
        let route = staged(pipeline(), |ctx: RequestContext| async move {
            let dto = ctx.object("dto").expect("dto is attached");
            Ok(respond::ok(dto.to_plain(false)))
        });

        let ctx = RequestContext::new(RequestMeta::new("POST", "/artworks"))
            .with_body(json!({"title": "Nocturne"}));
        let response = route(ctx).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_halted_pipeline_short_circuits() {
        let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen = called.clone();
        let route = staged(pipeline(), move |_ctx: RequestContext| {
            let seen = seen.clone();
            async move {
                seen.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(respond::ok(json!(null)))
            }
        });

        let ctx = RequestContext::new(RequestMeta::new("POST", "/artworks"))
            .with_body(json!({"title": ""}));
        let response = route(ctx).await;
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(
            !called.load(std::sync::atomic::Ordering::SeqCst),
            "handler must not run on a halted pipeline"
        );
    }

    #[tokio::test]
    async fn test_handler_error_maps_to_envelope() {
        let route = staged(pipeline(), |_ctx: RequestContext| async move {
            Err(PipelineError::Configuration(
                crate::core::error::ConfigurationError::Settings {
                    message: "broken wiring".to_string(),
                },
            ))
        });

        let ctx = RequestContext::new(RequestMeta::new("POST", "/artworks"))
            .with_body(json!({"title": "Nocturne"}));
        let response = route(ctx).await;
        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
