//! User schemas
//!
//! Accounts come in three roles; `visitor` is the default for new
//! registrations. The response shape deliberately omits any credential
//! material, which travels only in private `_`-prefixed DTO fields.

use serde_json::json;

use crate::schema::rules::{Rule, Transform};
use crate::schema::{FieldSchema, Schema};

use super::common::{username_pattern, uuid_field};

pub const ROLES: [&str; 3] = ["visitor", "artist", "curator"];

fn roles() -> Vec<String> {
    ROLES.iter().map(|r| r.to_string()).collect()
}

fn username_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .rule(Rule::Text)
        .rule(Rule::MinLength(3))
        .rule(Rule::MaxLength(32))
        .rule(Rule::Pattern(username_pattern()))
}

fn email_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .transform(Transform::Lowercase)
        .rule(Rule::Text)
        .rule(Rule::Email)
}

fn password_field() -> FieldSchema {
    FieldSchema::new().rule(Rule::Text).rule(Rule::MinLength(8))
}

fn display_name_field() -> FieldSchema {
    FieldSchema::new()
        .transform(Transform::Trim)
        .rule(Rule::Text)
        .rule(Rule::MaxLength(80))
}

fn role_field() -> FieldSchema {
    FieldSchema::new().rule(Rule::Text).rule(Rule::OneOf(roles()))
}

pub fn create_schema() -> Schema {
    Schema::builder()
        .field("username", username_field().required())
        .field("email", email_field().required())
        .field("password", password_field().required())
        .field("display_name", display_name_field())
        .field("role", role_field().default_value(json!("visitor")))
        .build()
}

/// Same rules as create, nothing required and no injected defaults.
pub fn update_schema() -> Schema {
    Schema::builder()
        .field("username", username_field())
        .field("email", email_field())
        .field("password", password_field())
        .field("display_name", display_name_field())
        .field("role", role_field())
        .build()
}

pub fn login_schema() -> Schema {
    Schema::builder()
        .field("email", email_field().required())
        .field(
            "password",
            FieldSchema::new().required().rule(Rule::Text).rule(Rule::NonEmpty),
        )
        .build()
}

pub fn response_schema() -> Schema {
    Schema::builder()
        .field("id", uuid_field().required())
        .field("username", username_field().required())
        .field("email", email_field().required())
        .field("role", role_field().required())
        .field("display_name", display_name_field())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_normalizes_and_defaults_role() {
        let outcome = create_schema().validate(&json!({
            "username": "  berthe.morisot  ",
            "email": "Berthe@Atelier.FR",
            "password": "impression1874"
        }));

        assert!(outcome.is_valid);
        assert_eq!(outcome.value["username"], "berthe.morisot");
        assert_eq!(outcome.value["email"], "berthe@atelier.fr");
        assert_eq!(outcome.value["role"], "visitor");
    }

    #[test]
    fn test_create_rejects_short_password_and_bad_role() {
        let outcome = create_schema().validate(&json!({
            "username": "bm",
            "email": "not-an-email",
            "password": "short",
            "role": "owner"
        }));

        assert!(!outcome.is_valid);
        let paths = outcome.failed_paths();
        assert!(paths.contains(&"username".to_string()));
        assert!(paths.contains(&"email".to_string()));
        assert!(paths.contains(&"password".to_string()));
        assert!(paths.contains(&"role".to_string()));
    }

    #[test]
    fn test_update_injects_nothing() {
        let outcome = update_schema().validate(&json!({"display_name": "Berthe"}));
        assert!(outcome.is_valid);
        assert_eq!(outcome.value, json!({"display_name": "Berthe"}));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let outcome = login_schema().validate(&json!({"email": "berthe@atelier.fr"}));
        assert!(!outcome.is_valid);
        assert_eq!(outcome.failed_paths(), vec!["password"]);
    }
}
