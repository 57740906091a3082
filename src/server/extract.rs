//! Request context extraction
//!
//! Builds a [`RequestContext`] straight from an axum request: route
//! template and method, caller metadata from proxy headers, the three
//! buckets from path parameters, query string and JSON body. Query and
//! path values arrive as strings, so scalars are coerced before the type
//! rules see them.

use axum::extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::core::error::{PipelineError, ValidationFailure};
use crate::core::{RequestContext, RequestMeta};

/// Request bodies larger than this are rejected before parsing.
pub const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Map a query or path string onto the JSON scalar it spells.
pub(crate) fn coerce_scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn client_ip(parts: &Parts) -> Option<String> {
    let forwarded = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    if forwarded.is_some() {
        return forwarded;
    }
    parts
        .headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn endpoint(parts: &Parts) -> String {
    parts
        .extensions
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

async fn params_bucket<S: Send + Sync>(parts: &mut Parts, state: &S) -> Value {
    let mut map = Map::new();
    if let Ok(params) = RawPathParams::from_request_parts(parts, state).await {
        for (key, value) in params.iter() {
            map.insert(key.to_string(), coerce_scalar(value));
        }
    }
    Value::Object(map)
}

async fn query_bucket<S: Send + Sync>(parts: &mut Parts, state: &S) -> Value {
    let mut map = Map::new();
    if let Ok(Query(pairs)) =
        Query::<HashMap<String, String>>::from_request_parts(parts, state).await
    {
        for (key, value) in pairs {
            map.insert(key, coerce_scalar(&value));
        }
    }
    Value::Object(map)
}

impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = PipelineError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let mut meta = RequestMeta::new(parts.method.as_str(), endpoint(&parts));
        meta.caller_ip = client_ip(&parts);
        meta.user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let params = params_bucket(&mut parts, state).await;
        let query = query_bucket(&mut parts, state).await;

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES)
            .await
            .map_err(|err| {
                PipelineError::Validation(ValidationFailure::MalformedJson {
                    message: err.to_string(),
                })
            })?;
        let body = if bytes.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|err| {
                PipelineError::Validation(ValidationFailure::MalformedJson {
                    message: err.to_string(),
                })
            })?
        };

        Ok(RequestContext::new(meta)
            .with_body(body)
            .with_query(query)
            .with_params(params))
    }
}
