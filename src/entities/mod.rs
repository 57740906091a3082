//! Gallery schema catalog
//!
//! One module per entity, each exposing plain functions that build the
//! schema for an intent. `register_all` wires the whole catalog into a
//! registry; the global registry calls it exactly once.

pub mod artwork;
pub mod comment;
pub mod common;
pub mod exhibition;
pub mod user;

use crate::schema::registry::{EntityKind, Intent, SchemaRegistry};

pub fn register_all(registry: &mut SchemaRegistry) {
    registry.register(EntityKind::User, Intent::Create, user::create_schema());
    registry.register(EntityKind::User, Intent::Update, user::update_schema());
    registry.register(EntityKind::User, Intent::Login, user::login_schema());
    registry.register(EntityKind::User, Intent::Response, user::response_schema());

    registry.register(EntityKind::Artwork, Intent::Create, artwork::create_schema());
    registry.register(EntityKind::Artwork, Intent::Update, artwork::update_schema());
    registry.register(EntityKind::Artwork, Intent::Query, artwork::query_schema());
    registry.register(EntityKind::Artwork, Intent::Response, artwork::response_schema());

    registry.register(
        EntityKind::Exhibition,
        Intent::Create,
        exhibition::create_schema(),
    );
    registry.register(
        EntityKind::Exhibition,
        Intent::Update,
        exhibition::update_schema(),
    );
    registry.register(
        EntityKind::Exhibition,
        Intent::Query,
        exhibition::query_schema(),
    );
    registry.register(
        EntityKind::Exhibition,
        Intent::Response,
        exhibition::response_schema(),
    );

    registry.register(EntityKind::Comment, Intent::Create, comment::create_schema());
    registry.register(
        EntityKind::Comment,
        Intent::Response,
        comment::response_schema(),
    );
}
