//! Data transfer objects
//!
//! [`DataObject`] is the one DTO type in the pipeline. It is built by
//! projecting a JSON payload through a schema (only declared fields come in),
//! validated in place, and serialized back out with private keys scrubbed.
//! There is no per-entity subclassing; the bound [`Schema`] is what makes a
//! `DataObject` a "user create" or an "artwork update".

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{Schema, ValidateOptions, ValidationOutcome};

/// Keys starting with this prefix never leave through the public projection.
pub const PRIVATE_PREFIX: char = '_';

/// Errors raised by DataObject construction and validation.
#[derive(Debug, Error)]
pub enum DataObjectError {
    #[error("cannot build '{name}' from a non-object payload")]
    NotAnObject { name: String },

    #[error("'{name}' has no schema bound")]
    NoSchema { name: String },
}

/// A validated, serializable wrapper around one payload's fields.
#[derive(Debug)]
pub struct DataObject {
    name: String,
    fields: IndexMap<String, Value>,
    original: IndexMap<String, Value>,
    schema: Option<Schema>,
    last_validation: Option<ValidationOutcome>,
}

impl DataObject {
    /// Build from a JSON object, projecting through `schema` when one is
    /// given: only keys the schema declares are taken in. Without a schema
    /// every key is taken. Anything but an object is rejected.
    pub fn from_value(
        name: impl Into<String>,
        value: &Value,
        schema: Option<Schema>,
    ) -> Result<Self, DataObjectError> {
        let name = name.into();
        let Some(object) = value.as_object() else {
            return Err(DataObjectError::NotAnObject { name });
        };

        let fields: IndexMap<String, Value> = match &schema {
            Some(s) => object
                .iter()
                .filter(|(key, _)| s.has_field(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            None => object
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        };

        Ok(Self {
            name,
            original: fields.clone(),
            fields,
            schema,
            last_validation: None,
        })
    }

    /// Diagnostic label, e.g. `"ArtworkCreate"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
        self.last_validation = None;
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.fields.shift_remove(key);
        if removed.is_some() {
            self.last_validation = None;
        }
        removed
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate against the bound schema with default options. Re-running
    /// without field changes yields an equal outcome.
    pub fn validate(&mut self) -> Result<&ValidationOutcome, DataObjectError> {
        self.validate_with(ValidateOptions::default())
    }

    /// Validate with explicit options.
    ///
    /// The schema sees the plain projection: `_`-prefixed members never
    /// reach validation. On success the sanitized value replaces the public
    /// fields and private members carry over untouched; the outcome
    /// (success or not) replaces `last_validation`.
    pub fn validate_with(
        &mut self,
        options: ValidateOptions,
    ) -> Result<&ValidationOutcome, DataObjectError> {
        let Some(schema) = self.schema.clone() else {
            return Err(DataObjectError::NoSchema {
                name: self.name.clone(),
            });
        };
        Ok(self.run_validation(&schema, options))
    }

    /// Validate against `schema` instead of the bound one, with the same
    /// projection and replacement behavior as [`Self::validate_with`]. The
    /// binding itself is left unchanged.
    pub fn validate_with_schema(
        &mut self,
        schema: &Schema,
        options: ValidateOptions,
    ) -> &ValidationOutcome {
        self.run_validation(schema, options)
    }

    fn run_validation(
        &mut self,
        schema: &Schema,
        options: ValidateOptions,
    ) -> &ValidationOutcome {
        let input = self.to_plain(false);
        let outcome = schema.validate_with(&input, options);
        if outcome.is_valid {
            if let Some(sanitized) = outcome.value.as_object() {
                let mut fields: IndexMap<String, Value> = sanitized
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                for (key, value) in self.fields.iter() {
                    if key.starts_with(PRIVATE_PREFIX) {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                self.fields = fields;
            }
        }
        &*self.last_validation.insert(outcome)
    }

    /// Outcome of the most recent validate call, if any.
    pub fn last_validation(&self) -> Option<&ValidationOutcome> {
        self.last_validation.as_ref()
    }

    /// Project to a plain JSON object. Keys starting with `_` are omitted
    /// unless `include_private`, recursively through nested objects and
    /// arrays.
    pub fn to_plain(&self, include_private: bool) -> Value {
        let mut object = Map::new();
        for (key, value) in self.fields.iter() {
            if !include_private && key.starts_with(PRIVATE_PREFIX) {
                continue;
            }
            object.insert(key.clone(), scrub(value, include_private));
        }
        Value::Object(object)
    }

    /// Plain object holding only the named keys. Private filtering applies.
    pub fn pick(&self, keys: &[&str]) -> Value {
        let mut object = Map::new();
        for (key, value) in self.fields.iter() {
            if !keys.contains(&key.as_str()) || key.starts_with(PRIVATE_PREFIX) {
                continue;
            }
            object.insert(key.clone(), scrub(value, false));
        }
        Value::Object(object)
    }

    /// Plain object without the named keys. Private filtering applies.
    pub fn omit(&self, keys: &[&str]) -> Value {
        let mut object = Map::new();
        for (key, value) in self.fields.iter() {
            if keys.contains(&key.as_str()) || key.starts_with(PRIVATE_PREFIX) {
                continue;
            }
            object.insert(key.clone(), scrub(value, false));
        }
        Value::Object(object)
    }

    /// New DataObject holding this object's fields overlaid with `other`'s;
    /// on key collision the other side wins. Name and schema come from
    /// `self`; the result carries no validation state.
    pub fn merge(&self, other: &DataObject) -> DataObject {
        let mut fields = self.fields.clone();
        for (key, value) in other.fields.iter() {
            fields.insert(key.clone(), value.clone());
        }
        DataObject {
            name: self.name.clone(),
            original: fields.clone(),
            fields,
            schema: self.schema.clone(),
            last_validation: None,
        }
    }

    /// Restore the fields captured at construction and clear validation
    /// state.
    pub fn reset(&mut self) {
        self.fields = self.original.clone();
        self.last_validation = None;
    }

    /// Keys whose current value differs from the construction snapshot,
    /// including keys removed since then.
    pub fn dirty_keys(&self) -> Vec<String> {
        let mut dirty: Vec<String> = self
            .fields
            .iter()
            .filter(|&(key, value)| self.original.get(key) != Some(value))
            .map(|(key, _)| key.clone())
            .collect();
        for key in self.original.keys() {
            if !self.fields.contains_key(key) {
                dirty.push(key.clone());
            }
        }
        dirty
    }
}

impl Clone for DataObject {
    /// A clone is a fresh object rebuilt from the full current projection,
    /// private keys included: the clone's original snapshot is the cloned
    /// current state and it carries no validation result.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fields: self.fields.clone(),
            original: self.fields.clone(),
            schema: self.schema.clone(),
            last_validation: None,
        }
    }
}

/// Drop `_`-prefixed keys from nested objects, descending through arrays.
fn scrub(value: &Value, include_private: bool) -> Value {
    if include_private {
        return value.clone();
    }
    match value {
        Value::Object(object) => {
            let mut scrubbed = Map::new();
            for (key, value) in object.iter() {
                if key.starts_with(PRIVATE_PREFIX) {
                    continue;
                }
                scrubbed.insert(key.clone(), scrub(value, include_private));
            }
            Value::Object(scrubbed)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| scrub(v, include_private)).collect())
        }
        other => other.clone(),
    }
}
