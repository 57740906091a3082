//! HTTP adapter
//!
//! Thin axum glue around the pipeline: a `FromRequest` impl that builds the
//! request context, envelope response helpers, and the `staged` combinator
//! that runs a pipeline in front of a handler.

pub mod extract;
pub mod respond;
pub mod router;

pub use extract::BODY_LIMIT_BYTES;
pub use router::staged;
