//! Comment schemas

use crate::schema::rules::{Rule, Transform};
use crate::schema::{FieldSchema, Schema};

use super::common::uuid_field;

fn body_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .rule(Rule::Text)
        .rule(Rule::NonEmpty)
        .rule(Rule::MaxLength(1000))
}

fn rating_field() -> FieldSchema {
    FieldSchema::new()
        .rule(Rule::Integer)
        .rule(Rule::Min(1.0))
        .rule(Rule::Max(5.0))
}

pub fn create_schema() -> Schema {
    Schema::builder()
        .field("artwork_id", uuid_field().required())
        .field("author_id", uuid_field().required())
        .field("body", body_field().required())
        .field("rating", rating_field())
        .build()
}

pub fn response_schema() -> Schema {
    Schema::builder()
        .field("id", uuid_field().required())
        .field("artwork_id", uuid_field().required())
        .field("author_id", uuid_field().required())
        .field("body", body_field().required())
        .field("rating", rating_field())
        .build()
}
