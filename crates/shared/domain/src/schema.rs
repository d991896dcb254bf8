//! User object schema: required fields and property types.
//!
//! The definition is a small subset of JSON Schema, the same shape as a
//! Swagger `definitions.User` entry:
//!
//! ```yaml
//! type: object
//! required: [email, firstname, lastname, company]
//! properties:
//!   email: { type: string }
//!   firstname: { type: string }
//! ```
//!
//! A whole Swagger document is accepted as well; its `definitions.User`
//! entry is used.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::constants::DEFAULT_REQUIRED_FIELDS;
use crate::error::{DomainError, DomainResult};

/// Primitive type a property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl PropertyType {
    /// Check whether a JSON value is of this type.
    pub fn admits(self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.is_i64() || value.is_u64(),
            PropertyType::Number => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::Object => value.is_object(),
            PropertyType::Array => value.is_array(),
            PropertyType::Null => value.is_null(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Object => "object",
            PropertyType::Array => "array",
            PropertyType::Null => "null",
        }
    }
}

/// Declared property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: Option<PropertyType>,
}

/// Object schema of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSchema {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, Property>,
    #[serde(default = "allow_additional")]
    additional_properties: bool,
}

fn allow_additional() -> bool {
    true
}

#[derive(Deserialize)]
struct SwaggerDocument {
    definitions: SwaggerDefinitions,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SwaggerDefinitions {
    user: UserSchema,
}

impl Default for UserSchema {
    fn default() -> Self {
        Self::with_required(DEFAULT_REQUIRED_FIELDS.iter().copied())
    }
}

impl UserSchema {
    /// Build a schema requiring the given string fields.
    pub fn with_required<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: Vec<String> = names.into_iter().map(Into::into).collect();
        let properties = required
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    Property {
                        kind: Some(PropertyType::String),
                    },
                )
            })
            .collect();
        Self {
            required,
            properties,
            additional_properties: true,
        }
    }

    /// Parse a definition from JSON or YAML text.
    ///
    /// YAML is a superset of JSON, so a single parser covers both.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let raw: Value =
            serde_yaml::from_str(text).map_err(|e| DomainError::definition(e.to_string()))?;

        let schema = if raw.get("definitions").is_some() {
            serde_json::from_value::<SwaggerDocument>(raw)
                .map(|doc| doc.definitions.user)
                .map_err(|e| DomainError::definition(e.to_string()))?
        } else {
            serde_json::from_value::<UserSchema>(raw)
                .map_err(|e| DomainError::definition(e.to_string()))?
        };

        if schema.required.is_empty() {
            return Err(DomainError::definition("schema declares no required fields"));
        }
        Ok(schema)
    }

    /// Load a definition file from disk.
    pub fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DomainError::definition(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    /// Names of the required fields, in declaration order.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Check a payload against the schema.
    pub fn validate(&self, payload: &Value) -> DomainResult<()> {
        let object = payload
            .as_object()
            .ok_or_else(|| DomainError::schema("payload is not an object"))?;

        if let Some(missing) = self.required.iter().find(|name| !object.contains_key(*name)) {
            return Err(DomainError::schema(format!("'{}' is a required property", missing)));
        }

        for (name, value) in object {
            match self.properties.get(name) {
                Some(Property { kind: Some(kind) }) if !kind.admits(value) => {
                    return Err(DomainError::schema(format!(
                        "'{}' is not of type '{}'",
                        name,
                        kind.name()
                    )));
                }
                Some(_) => {}
                None if !self.additional_properties => {
                    return Err(DomainError::schema(format!(
                        "additional property '{}' is not allowed",
                        name
                    )));
                }
                None => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_schema_requires_four_fields() {
        let schema = UserSchema::default();
        assert_eq!(schema.required(), ["email", "firstname", "lastname", "company"]);
    }

    #[test]
    fn valid_payload_passes() {
        let payload = json!({
            "email": "m.neuer@example.com", "firstname": "Manuel",
            "lastname": "Neuer", "company": "Yandex", "status": "confirmed"
        });
        assert!(UserSchema::default().validate(&payload).is_ok());
    }

    #[test]
    fn missing_required_key_fails() {
        let payload = json!({"email": "a@x.com", "firstname": "A", "lastname": "B"});
        let err = UserSchema::default().validate(&payload).unwrap_err();
        assert_eq!(err, DomainError::schema("'company' is a required property"));
    }

    #[test]
    fn wrong_type_fails() {
        let payload = json!({"email": "a@x.com", "firstname": 1, "lastname": "B", "company": "C"});
        assert!(matches!(
            UserSchema::default().validate(&payload),
            Err(DomainError::Schema(_))
        ));
    }

    #[test]
    fn non_object_fails() {
        assert!(UserSchema::default().validate(&json!(["a"])).is_err());
        assert!(UserSchema::default().validate(&json!("text")).is_err());
    }

    #[test]
    fn parses_bare_yaml_definition() {
        let text = r#"
type: object
required:
  - email
  - age
properties:
  email:
    type: string
  age:
    type: integer
additionalProperties: false
"#;
        let schema = UserSchema::parse(text).unwrap();
        assert_eq!(schema.required(), ["email", "age"]);
        assert!(schema.validate(&json!({"email": "a@x.com", "age": 3})).is_ok());
        assert!(schema.validate(&json!({"email": "a@x.com", "age": 3.5})).is_err());
        assert!(schema.validate(&json!({"email": "a@x.com", "age": 3, "x": 1})).is_err());
    }

    #[test]
    fn parses_swagger_json_document() {
        let text = r#"{
            "swagger": "2.0",
            "definitions": {
                "User": {
                    "type": "object",
                    "required": ["email", "company"],
                    "properties": {"email": {"type": "string"}, "company": {"type": "string"}}
                },
                "Error": {"type": "object"}
            }
        }"#;
        let schema = UserSchema::parse(text).unwrap();
        assert_eq!(schema.required(), ["email", "company"]);
    }

    #[test]
    fn rejects_definition_without_required_fields() {
        assert!(matches!(
            UserSchema::parse("type: object"),
            Err(DomainError::Definition(_))
        ));
    }
}
