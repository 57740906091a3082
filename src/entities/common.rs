//! Shared schema fragments
//!
//! Field shapes that recur across the catalog: UUID identifiers, the
//! path-parameter schema for `/{id}` routes and list pagination.

use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

use crate::schema::rules::Rule;
use crate::schema::{FieldSchema, Schema};

pub fn username_pattern() -> Regex {
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("username regex is valid"))
        .clone()
}

/// String field holding a UUID; callers mark it required as needed.
pub fn uuid_field() -> FieldSchema {
    FieldSchema::new().rule(Rule::Text).rule(Rule::UuidFormat)
}

/// Schema for the `id` path parameter.
pub fn id_params_schema() -> Schema {
    Schema::builder().field("id", uuid_field().required()).build()
}

pub fn page_field() -> FieldSchema {
    FieldSchema::new()
        .rule(Rule::Integer)
        .rule(Rule::Min(1.0))
        .default_value(json!(1))
}

pub fn per_page_field() -> FieldSchema {
    FieldSchema::new()
        .rule(Rule::Integer)
        .rule(Rule::Min(1.0))
        .rule(Rule::Max(100.0))
        .default_value(json!(20))
}
