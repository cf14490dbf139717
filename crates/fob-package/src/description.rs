//! Request schema and UI description types.
//!
//! A [`PackageRequest`] is the deserialized body of a build request. It is
//! checked once with [`PackageRequest::validate`] before any work starts; the
//! pipeline only ever sees a [`ValidatedRequest`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::naming::camel_case_to_dash_case;
use crate::workspace::validate_file_name;

/// JSON object used for token and style-set mappings.
pub type JsonObject = Map<String, Value>;

/// Shared design tokens.
///
/// Only `tokens` is inspected by the pipeline. Every other key is carried
/// through to the generators untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignLanguage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<JsonObject>,

    #[serde(flatten)]
    pub extra: JsonObject,
}

impl DesignLanguage {
    /// True when no tokens are declared (absent or empty mapping).
    pub fn has_no_tokens(&self) -> bool {
        self.tokens.as_ref().is_none_or(|tokens| tokens.is_empty())
    }
}

/// Named reusable style sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSetDefinitions(pub JsonObject);

impl StyleSetDefinitions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One component description, opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentDescription(pub Value);

impl ComponentDescription {
    /// The component's declared name, used for logging.
    pub fn name(&self) -> &str {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Body of `POST /build-package`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRequest {
    #[serde(default)]
    pub entry: Option<String>,

    #[serde(default)]
    pub components: Vec<ComponentDescription>,

    #[serde(default)]
    pub design_language: Option<DesignLanguage>,

    #[serde(default)]
    pub style_set_definitions: Option<StyleSetDefinitions>,
}

/// Why a request was turned away before any work began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequestRejection {
    #[error("Entry file is missing")]
    EntryMissing,

    #[error("No components received")]
    NoComponents,

    #[error("Invalid entry file name")]
    InvalidEntry,

    #[error("Invalid request body")]
    Malformed,
}

impl RequestRejection {
    /// Fixed text returned to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            Self::EntryMissing => "Entry file is missing",
            Self::NoComponents => "No components received",
            Self::InvalidEntry => "Invalid entry file name",
            Self::Malformed => "Invalid request body",
        }
    }
}

/// A request that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub entry: String,
    pub components: Vec<ComponentDescription>,
    pub design_language: DesignLanguage,
    pub style_set_definitions: StyleSetDefinitions,
}

impl PackageRequest {
    /// Parse a raw body.
    ///
    /// An empty body is an empty request (and will fail validation with
    /// [`RequestRejection::EntryMissing`]). JSON that does not match the
    /// schema is [`RequestRejection::Malformed`].
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestRejection> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|_| RequestRejection::Malformed)
    }

    /// Check required fields. The entry is checked before the components.
    ///
    /// # Errors
    ///
    /// - [`RequestRejection::EntryMissing`] when `entry` is absent or blank.
    /// - [`RequestRejection::InvalidEntry`] when the entry would not name a
    ///   single file inside the build directory (separators, `..`, null bytes).
    /// - [`RequestRejection::NoComponents`] when `components` is empty.
    pub fn validate(self) -> Result<ValidatedRequest, RequestRejection> {
        let entry = match self.entry {
            Some(entry) if !entry.trim().is_empty() => entry,
            _ => return Err(RequestRejection::EntryMissing),
        };
        if validate_file_name(&camel_case_to_dash_case(&entry)).is_err() {
            return Err(RequestRejection::InvalidEntry);
        }

        if self.components.is_empty() {
            return Err(RequestRejection::NoComponents);
        }

        Ok(ValidatedRequest {
            entry,
            components: self.components,
            design_language: self.design_language.unwrap_or_default(),
            style_set_definitions: self.style_set_definitions.unwrap_or_default(),
        })
    }
}

impl ValidatedRequest {
    /// Whether the request carries anything a global stylesheet could hold.
    pub fn needs_stylesheet(&self) -> bool {
        !self.style_set_definitions.is_empty() || !self.design_language.has_no_tokens()
    }
}

/// Synthetic root description carrying only the shared tokens and style sets.
#[derive(Debug, Clone)]
pub struct RootDescription(Value);

impl RootDescription {
    pub const NAME: &'static str = "root";

    pub fn new(
        design_language: &DesignLanguage,
        style_set_definitions: &StyleSetDefinitions,
    ) -> Self {
        Self(json!({
            "name": Self::NAME,
            "designLanguage": design_language,
            "styleSetDefinitions": style_set_definitions,
            "stateDefinitions": {},
            "propDefinitions": {},
            "node": {
                "type": "element",
                "content": { "elementType": "container" }
            }
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// A description after it went through a [`crate::Normalizer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedDescription(Value);

impl NormalizedDescription {
    /// Wrap a value a normalizer has already checked.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn name(&self) -> &str {
        self.0.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn style_set_definitions(&self) -> StyleSetDefinitions {
        match self.0.get("styleSetDefinitions") {
            Some(Value::Object(map)) => StyleSetDefinitions(map.clone()),
            _ => StyleSetDefinitions::default(),
        }
    }

    pub fn design_language(&self) -> DesignLanguage {
        self.0
            .get("designLanguage")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}
