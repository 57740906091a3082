//! # Vernissage
//!
//! A schema-driven validation pipeline for JSON web backends.
//!
//! ## Features
//!
//! - **Declarative Schemas**: Pure data descriptors with transforms, rules,
//!   nested objects and array items
//! - **Staged Pipeline**: Ordered, fail-fast stages over a mutable request
//!   context (body, query, path parameters, uploads)
//! - **Sanitized Buckets**: Valid input replaces its bucket trimmed, typed
//!   and filled with defaults; attached `DataObject`s carry the result
//! - **Conditional Rules**: Predicate-gated stages and per-rule skip
//!   conditions, evaluated lazily
//! - **Upload Constraints**: Size, MIME type, count and presence checks in a
//!   fixed order
//! - **Response Screening**: Per-response guarded sinks that replace
//!   payloads violating the response contract
//! - **Uniform Envelopes**: Every response is a success or error envelope
//!   with a stable shape
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vernissage::prelude::*;
//!
//! let pipeline = StagePipeline::new()
//!     .stage(ValidationStage::new(
//!         "ArtworkCreate",
//!         registry_factory(EntityKind::Artwork, Intent::Create),
//!     ));
//!
//! let app = Router::new().route(
//!     "/artworks",
//!     post(staged(pipeline, |ctx: RequestContext| async move {
//!         let dto = ctx.object("dto").expect("attached by the pipeline");
//!         Ok(respond::created(dto.to_plain(false)))
//!     })),
//! );
//! ```

pub mod config;
pub mod core;
pub mod dto;
pub mod entities;
pub mod schema;
pub mod server;
pub mod stages;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Bucket, DiagLevel, Diagnostics, ErrorEnvelope, PipelineError, PipelineResult,
        RecordingDiagnostics, RequestContext, RequestMeta, SuccessEnvelope, TracingDiagnostics,
        UploadedFile, is_success_envelope,
    };

    // === Schemas ===
    pub use crate::schema::{
        FieldError, FieldSchema, Rule, Schema, SchemaFactory, Transform, ValidateOptions,
        ValidationOutcome, fixed_factory, registry_factory,
    };
    pub use crate::schema::registry::{EntityKind, Intent, SchemaRegistry};

    // === Data objects ===
    pub use crate::dto::{DataObject, PRIVATE_PREFIX};

    // === Stages ===
    pub use crate::stages::{
        AttachmentConstraintStage, BufferSink, CompositeValidationStage, ConditionalStage,
        GuardedSink, ResponseSink, ResponseValidationStage, Stage, StageFlow, StagePipeline,
        ValidationRule, ValidationStage,
    };

    // === Config ===
    pub use crate::config::{Environment, PipelineSettings};

    // === Server ===
    pub use crate::server::{respond, staged};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        http::StatusCode,
        routing::{delete, get, post, put},
    };
}
