//! Source generation collaborators.
//!
//! The pipeline never produces source code itself. It hands normalized
//! descriptions to a [`StyleSheetGenerator`] and a [`ComponentGenerator`] and
//! writes back whatever files they return.

use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::description::{DesignLanguage, NormalizedDescription, StyleSetDefinitions};
use crate::normalize::ValidationError;

/// Logical name of the global stylesheet components import.
pub const STYLE_SHEET_FILE_NAME: &str = "style";

/// Kind of a generated file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Js,
    Css,
    Html,
    Json,
    #[serde(untagged)]
    Other(String),
}

impl FileType {
    /// On-disk extension for this kind. Source modules are written as `.jsx`.
    pub fn extension(&self) -> &str {
        match self {
            Self::Js => "jsx",
            Self::Css => "css",
            Self::Html => "html",
            Self::Json => "json",
            Self::Other(ext) => ext,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Js => f.write_str("js"),
            Self::Other(ext) => f.write_str(ext),
            other => f.write_str(other.extension()),
        }
    }
}

/// One file produced by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFile {
    pub name: String,
    pub file_type: FileType,
    pub content: String,
}

/// Files plus the third-party packages they import.
///
/// `dependencies` maps a package name to its version descriptor. The
/// descriptor is opaque to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOutput {
    #[serde(default)]
    pub files: Vec<GeneratedFile>,

    #[serde(default)]
    pub dependencies: IndexMap<String, Value>,
}

/// Reference to the project-wide stylesheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStyleSet {
    pub style_set_definitions: StyleSetDefinitions,
    pub file_name: String,
    pub path: String,
    pub import_file: bool,
}

impl ProjectStyleSet {
    pub fn new(style_set_definitions: StyleSetDefinitions, import_file: bool) -> Self {
        Self {
            style_set_definitions,
            file_name: STYLE_SHEET_FILE_NAME.to_string(),
            path: "./".to_string(),
            import_file,
        }
    }
}

/// Options passed with every generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default)]
    pub is_root_component: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_style_set: Option<ProjectStyleSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_language: Option<DesignLanguage>,
}

impl GenerationOptions {
    /// Options for the global stylesheet of the synthetic root.
    pub fn root() -> Self {
        Self {
            is_root_component: true,
            ..Self::default()
        }
    }

    /// Options for a regular component.
    pub fn component(
        style_set_definitions: StyleSetDefinitions,
        design_language: DesignLanguage,
        import_style_sheet: bool,
    ) -> Self {
        Self {
            is_root_component: false,
            project_style_set: Some(ProjectStyleSet::new(
                style_set_definitions,
                import_style_sheet,
            )),
            design_language: Some(design_language),
        }
    }
}

/// Errors from a generator collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generator returned no files")]
    NoFiles,

    #[error("invalid description: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Other(String),
}

/// Generates the global stylesheet for the synthetic root description.
#[async_trait]
pub trait StyleSheetGenerator: Send + Sync {
    async fn generate_style_sheet(
        &self,
        root: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError>;
}

/// Generates framework source files for one component.
#[async_trait]
pub trait ComponentGenerator: Send + Sync {
    async fn generate_component(
        &self,
        component: &NormalizedDescription,
        options: &GenerationOptions,
    ) -> Result<GeneratorOutput, GenerateError>;
}
