//! Description validation and normalization.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::description::NormalizedDescription;

/// Errors produced while normalizing a description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("description must be a JSON object")]
    NotAnObject,

    #[error("description is missing a non-empty `name`")]
    MissingName,

    #[error("description `{name}` is missing an object `node`")]
    MissingNode { name: String },

    #[error("field `{field}` of `{name}` must be an object")]
    NotAnObjectField { name: String, field: &'static str },
}

/// Turns a raw description into a normalized, internally consistent one.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, raw: &Value) -> Result<NormalizedDescription, ValidationError>;
}

/// Structural checks plus default filling.
///
/// Mapping fields that are absent (or `null`) become `{}`. Fields that are
/// present with the wrong shape are rejected rather than silently dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralNormalizer;

const OBJECT_FIELDS: [&str; 4] = [
    "stateDefinitions",
    "propDefinitions",
    "styleSetDefinitions",
    "designLanguage",
];

impl StructuralNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn normalize_value(raw: &Value) -> Result<Value, ValidationError> {
        let Value::Object(source) = raw else {
            return Err(ValidationError::NotAnObject);
        };
        let mut object = source.clone();

        let name = match object.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return Err(ValidationError::MissingName),
        };

        if !matches!(object.get("node"), Some(Value::Object(_))) {
            return Err(ValidationError::MissingNode { name });
        }

        for field in OBJECT_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => {
                    object.insert(field.to_string(), Value::Object(Map::new()));
                }
                Some(Value::Object(_)) => {}
                Some(_) => {
                    return Err(ValidationError::NotAnObjectField { name, field });
                }
            }
        }

        if let Some(Value::Object(language)) = object.get("designLanguage") {
            match language.get("tokens") {
                None | Some(Value::Null) | Some(Value::Object(_)) => {}
                Some(_) => {
                    return Err(ValidationError::NotAnObjectField {
                        name,
                        field: "designLanguage.tokens",
                    });
                }
            }
        }

        Ok(Value::Object(object))
    }
}

#[async_trait]
impl Normalizer for StructuralNormalizer {
    async fn normalize(&self, raw: &Value) -> Result<NormalizedDescription, ValidationError> {
        Self::normalize_value(raw).map(NormalizedDescription::new)
    }
}
