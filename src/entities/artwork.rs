//! Artwork schemas

use crate::schema::rules::{Rule, Transform};
use crate::schema::{FieldSchema, Schema};

use super::common::{page_field, per_page_field, uuid_field};

pub const MEDIUMS: [&str; 6] = [
    "painting",
    "sculpture",
    "photography",
    "printmaking",
    "digital",
    "mixed_media",
];

pub const SORT_KEYS: [&str; 4] = ["newest", "oldest", "title", "price"];

fn mediums() -> Vec<String> {
    MEDIUMS.iter().map(|m| m.to_string()).collect()
}

fn title_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .rule(Rule::Text)
        .rule(Rule::NonEmpty)
        .rule(Rule::MaxLength(160))
}

fn year_field() -> FieldSchema {
    FieldSchema::new()
        .rule(Rule::Integer)
        .rule(Rule::Min(1000.0))
        .rule(Rule::Max(3000.0))
}

fn medium_field() -> FieldSchema {
    FieldSchema::new().rule(Rule::Text).rule(Rule::OneOf(mediums()))
}

fn price_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::RoundDecimals(2))
        .rule(Rule::Number)
        .rule(Rule::Min(0.0))
}

fn description_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .rule(Rule::Text)
        .rule(Rule::MaxLength(2000))
}

fn tags_field() -> FieldSchema {
    FieldSchema::new()
        .rule(Rule::Array)
        .rule(Rule::MaxItems(20))
        .rule(Rule::Items(Box::new(
            FieldSchema::new().rule(Rule::Text).rule(Rule::NonEmpty),
        )))
}

pub fn create_schema() -> Schema {
    Schema::builder()
        .field("title", title_field().required())
        .field("artist_id", uuid_field().required())
        .field("year", year_field())
        .field("medium", medium_field().required())
        .field("price", price_field().required())
        .field("description", description_field())
        .field("tags", tags_field())
        .build()
}

pub fn update_schema() -> Schema {
    Schema::builder()
        .field("title", title_field())
        .field("artist_id", uuid_field())
        .field("year", year_field())
        .field("medium", medium_field())
        .field("price", price_field())
        .field("description", description_field())
        .field("tags", tags_field())
        .build()
}

pub fn query_schema() -> Schema {
    Schema::builder()
        .field("page", page_field())
        .field("per_page", per_page_field())
        .field("medium", medium_field())
        .field(
            "sort",
            FieldSchema::new().rule(Rule::Text).rule(Rule::OneOf(
                SORT_KEYS.iter().map(|s| s.to_string()).collect(),
            )),
        )
        .build()
}

pub fn response_schema() -> Schema {
    Schema::builder()
        .field("id", uuid_field().required())
        .field("title", title_field().required())
        .field("artist_id", uuid_field().required())
        .field("year", year_field())
        .field("medium", medium_field())
        .field("price", price_field())
        .field("description", description_field())
        .field("tags", tags_field())
        .build()
}
