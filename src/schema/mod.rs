//! Declarative payload schemas
//!
//! A [`Schema`] describes one payload shape: an ordered map of field names to
//! [`FieldSchema`] entries (required flag, transforms, rules, default).
//! Schemas are immutable once built and cheap to clone; one instance serves
//! every request that validates the same entity and intent.
//!
//! Validation produces a [`ValidationOutcome`]: the collected field errors
//! plus a sanitized copy of the payload (defaults filled, transforms applied,
//! unknown keys stripped).

pub mod registry;
pub mod rules;

pub use registry::{EntityKind, Intent, SchemaFactory, SchemaRegistry, fixed_factory, registry_factory};
pub use rules::{CustomCheck, Rule, Transform};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A single field failure produced by schema validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Path segments from the payload root, e.g. `["tags", "3"]`
    pub path: Vec<String>,
    /// Human-readable message naming the field
    pub message: String,
    /// The offending value, when one was present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_value: Option<Value>,
}

impl FieldError {
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            invalid_value: None,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.invalid_value = Some(value);
        self
    }

    /// Dotted rendering of the path, e.g. `tags.3`
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Options for one validation run.
///
/// Call sites merge overrides over the defaults with struct update syntax:
/// `ValidateOptions { abort_early: true, ..Default::default() }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Stop at the first failing field instead of collecting every error
    pub abort_early: bool,
    /// Keep unknown keys in the sanitized value instead of rejecting them
    pub allow_unknown: bool,
    /// Drop unknown keys silently; takes precedence over `allow_unknown`
    pub strip_unknown: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            abort_early: false,
            allow_unknown: false,
            strip_unknown: true,
        }
    }
}

/// Result of validating a payload against a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    /// Field errors in schema order; empty when valid
    pub errors: Vec<FieldError>,
    /// Sanitized payload; meaningful only when `is_valid`
    pub value: Value,
}

impl ValidationOutcome {
    /// All failing field paths, dotted, in order.
    pub fn failed_paths(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.dotted_path()).collect()
    }

    /// The individual messages joined by `", "`.
    pub fn joined_message(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Description of one field: requiredness, transforms, rules, default.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    required: bool,
    transforms: Vec<Transform>,
    rules: Vec<Rule>,
    default: Option<Value>,
}

impl FieldSchema {
    pub fn new() -> Self {
        // `Self::default()` would resolve to the `default()` accessor below.
        Default::default()
    }

    /// The field must be present and non-null.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Append a transform; transforms run in insertion order, before rules.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Append a rule; rules run in insertion order, first failure wins.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Value filled in when the field is absent or null.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Immutable, shareable descriptor of one payload shape.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Arc<IndexMap<String, FieldSchema>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate with default options.
    pub fn validate(&self, input: &Value) -> ValidationOutcome {
        self.validate_with(input, ValidateOptions::default())
    }

    /// Validate `input` and build the sanitized value.
    ///
    /// The sanitized value lists schema fields first, in declaration order,
    /// followed by any kept unknown keys in input order.
    pub fn validate_with(&self, input: &Value, options: ValidateOptions) -> ValidationOutcome {
        let Some(object) = input.as_object() else {
            return ValidationOutcome {
                is_valid: false,
                errors: vec![
                    FieldError::new(Vec::new(), "payload must be a JSON object")
                        .with_value(input.clone()),
                ],
                value: input.clone(),
            };
        };

        let mut errors = Vec::new();
        let mut sanitized = Map::new();

        for (name, field) in self.fields.iter() {
            let raw = object.get(name).filter(|v| !v.is_null());
            match raw {
                Some(value) => {
                    let path = vec![name.clone()];
                    let (field_errors, value) =
                        validate_field(&path, field, value.clone(), options);
                    if field_errors.is_empty() {
                        sanitized.insert(name.clone(), value);
                    } else {
                        errors.extend(field_errors);
                    }
                }
                None => {
                    if let Some(default) = field.default() {
                        sanitized.insert(name.clone(), default.clone());
                    } else if field.is_required() {
                        errors.push(FieldError::new(
                            vec![name.clone()],
                            format!("'{}' is required", name),
                        ));
                    }
                }
            }
            if options.abort_early && !errors.is_empty() {
                break;
            }
        }

        if !(options.abort_early && !errors.is_empty()) {
            for (key, value) in object.iter() {
                if self.fields.contains_key(key) {
                    continue;
                }
                if options.strip_unknown {
                    continue;
                }
                if options.allow_unknown {
                    sanitized.insert(key.clone(), value.clone());
                } else {
                    errors.push(
                        FieldError::new(
                            vec![key.clone()],
                            format!("'{}' is not a recognized field", key),
                        )
                        .with_value(value.clone()),
                    );
                    if options.abort_early {
                        break;
                    }
                }
            }
        }

        ValidationOutcome {
            is_valid: errors.is_empty(),
            errors,
            value: Value::Object(sanitized),
        }
    }
}

/// Run one field's transforms and rules, descending into nested schemas and
/// array items. Returns the collected errors and the (possibly rebuilt)
/// value.
fn validate_field(
    path: &[String],
    field: &FieldSchema,
    mut value: Value,
    options: ValidateOptions,
) -> (Vec<FieldError>, Value) {
    for transform in field.transforms() {
        value = transform.apply(value);
    }

    let dotted = path.join(".");
    let mut errors = Vec::new();

    for rule in field.rules() {
        match rule {
            Rule::Nested(schema) => {
                if !value.is_object() {
                    errors.push(
                        FieldError::new(path.to_vec(), format!("'{}' must be an object", dotted))
                            .with_value(value.clone()),
                    );
                    break;
                }
                let inner = schema.validate_with(&value, options);
                if inner.is_valid {
                    value = inner.value;
                } else {
                    errors.extend(inner.errors.into_iter().map(|mut e| {
                        let mut prefixed = path.to_vec();
                        prefixed.append(&mut e.path);
                        e.path = prefixed;
                        e
                    }));
                    break;
                }
            }
            Rule::Items(item) => {
                let Some(elements) = value.as_array() else {
                    errors.push(
                        FieldError::new(path.to_vec(), format!("'{}' must be an array", dotted))
                            .with_value(value.clone()),
                    );
                    break;
                };
                let mut rebuilt = Vec::with_capacity(elements.len());
                let mut item_errors = Vec::new();
                for (index, element) in elements.iter().enumerate() {
                    let mut element_path = path.to_vec();
                    element_path.push(index.to_string());
                    let (element_errors, element_value) =
                        validate_field(&element_path, item, element.clone(), options);
                    if element_errors.is_empty() {
                        rebuilt.push(element_value);
                    } else {
                        item_errors.extend(element_errors);
                        if options.abort_early {
                            break;
                        }
                    }
                }
                if item_errors.is_empty() {
                    value = Value::Array(rebuilt);
                } else {
                    errors.extend(item_errors);
                    break;
                }
            }
            rule => {
                if let Err(message) = rule.check(&dotted, &value) {
                    errors.push(
                        FieldError::new(path.to_vec(), message).with_value(value.clone()),
                    );
                    break;
                }
            }
        }
    }

    (errors, value)
}

/// Builder accumulating fields in declaration order.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: IndexMap<String, FieldSchema>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: Arc::new(self.fields),
        }
    }
}
