//! Exhibition schemas

use serde_json::json;

use crate::schema::rules::{Rule, Transform};
use crate::schema::{FieldSchema, Schema};

use super::common::{page_field, per_page_field, uuid_field};

fn title_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .rule(Rule::Text)
        .rule(Rule::NonEmpty)
        .rule(Rule::MaxLength(160))
}

fn date_field() -> FieldSchema {
    FieldSchema::new().rule(Rule::Text).rule(Rule::IsoDate)
}

fn artwork_ids_field() -> FieldSchema {
    FieldSchema::new()
        .rule(Rule::Array)
        .rule(Rule::MinItems(1))
        .rule(Rule::MaxItems(200))
        .rule(Rule::Items(Box::new(uuid_field())))
}

fn open_to_public_field() -> FieldSchema {
    FieldSchema::new().rule(Rule::Boolean)
}

pub fn create_schema() -> Schema {
    Schema::builder()
        .field("title", title_field().required())
        .field("starts_on", date_field().required())
        .field("ends_on", date_field().required())
        .field("curator_id", uuid_field().required())
        .field("artwork_ids", artwork_ids_field().required())
        .field("open_to_public", open_to_public_field().default_value(json!(true)))
        .build()
}

pub fn update_schema() -> Schema {
    Schema::builder()
        .field("title", title_field())
        .field("starts_on", date_field())
        .field("ends_on", date_field())
        .field("curator_id", uuid_field())
        .field("artwork_ids", artwork_ids_field())
        .field("open_to_public", open_to_public_field())
        .build()
}

pub fn query_schema() -> Schema {
    Schema::builder()
        .field("page", page_field())
        .field("per_page", per_page_field())
        .field("curator_id", uuid_field())
        .field("open_to_public", open_to_public_field())
        .build()
}

pub fn response_schema() -> Schema {
    Schema::builder()
        .field("id", uuid_field().required())
        .field("title", title_field().required())
        .field("starts_on", date_field().required())
        .field("ends_on", date_field().required())
        .field("curator_id", uuid_field())
        .field("artwork_ids", artwork_ids_field())
        .field("open_to_public", open_to_public_field())
        .build()
}
