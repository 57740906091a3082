//! Process-wide schema catalog
//!
//! Schemas are looked up by (entity, intent) pair. The global registry is
//! built exactly once, on first access, and never mutated afterwards; stages
//! reach it through [`SchemaFactory`] closures so an unknown pair surfaces at
//! request time as a configuration error instead of a panic.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::Schema;

/// Entities the gallery validates payloads for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Artwork,
    Exhibition,
    Comment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Artwork => "artwork",
            EntityKind::Exhibition => "exhibition",
            EntityKind::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the payload is for: each intent gets its own schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Create,
    Update,
    Login,
    Query,
    Response,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Create => "create",
            Intent::Update => "update",
            Intent::Login => "login",
            Intent::Query => "query",
            Intent::Response => "response",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closure handed to validation stages; `None` means the wiring points at an
/// unregistered pair.
pub type SchemaFactory = Arc<dyn Fn() -> Option<Schema> + Send + Sync>;

/// Immutable map from (entity, intent) to its schema.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<(EntityKind, Intent), Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema for the pair, replacing any earlier entry.
    pub fn register(&mut self, kind: EntityKind, intent: Intent, schema: Schema) {
        self.schemas.insert((kind, intent), schema);
    }

    /// Look up the schema for a pair; clones share the underlying fields.
    pub fn get(&self, kind: EntityKind, intent: Intent) -> Option<Schema> {
        self.schemas.get(&(kind, intent)).cloned()
    }

    pub fn contains(&self, kind: EntityKind, intent: Intent) -> bool {
        self.schemas.contains_key(&(kind, intent))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// The catalog-backed global registry, built on first access.
    pub fn global() -> &'static SchemaRegistry {
        static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let mut registry = SchemaRegistry::new();
            crate::entities::register_all(&mut registry);
            registry
        })
    }
}

/// Factory resolving the pair through the global catalog at call time.
pub fn registry_factory(kind: EntityKind, intent: Intent) -> SchemaFactory {
    Arc::new(move || SchemaRegistry::global().get(kind, intent))
}

/// Factory that always yields the given schema. Useful for ad-hoc wiring and
/// tests that do not go through the catalog.
pub fn fixed_factory(schema: Schema) -> SchemaFactory {
    Arc::new(move || Some(schema.clone()))
}
