//! Pipeline error types.
//!
//! Every failure carries the [`Stage`] it happened in and maps to exactly one
//! [`FailureKind`]. The kind decides the fixed message a caller sees; the
//! error itself (with its full source chain) is only ever logged.

use std::fmt;

use serde::Serialize;

use crate::bundler::BundleError;
use crate::description::RequestRejection;
use crate::generator::GenerateError;
use crate::normalize::ValidationError;
use crate::store::StoreError;
use crate::workspace::WorkspaceError;

/// Caller-facing text for stylesheet failures.
pub const STYLE_SHEET_FAILURE_MESSAGE: &str = "Failed in generating global style sheet";

/// Caller-facing text for every other internal failure.
pub const COMPONENT_FAILURE_MESSAGE: &str = "Failed in generating component";

/// States of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    StylesheetGen,
    ComponentGen,
    Bundling,
    Publishing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validating => "validating",
            Stage::StylesheetGen => "stylesheet_gen",
            Stage::ComponentGen => "component_gen",
            Stage::Bundling => "bundling",
            Stage::Publishing => "publishing",
            Stage::Done => "done",
        })
    }
}

/// Classification of a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    BadRequest,
    WorkspaceError,
    StylesheetError,
    ComponentError,
    BundleError,
    PublishError,
}

impl FailureKind {
    /// True when the caller is at fault and the failure maps to a `400`.
    ///
    /// Every other kind is an internal failure, reported as a `500` with a
    /// fixed message that hides the cause.
    pub fn is_client_error(self) -> bool {
        matches!(self, FailureKind::BadRequest)
    }
}

/// Why producing one generated file set failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    Normalize(#[from] ValidationError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Write(#[from] WorkspaceError),
}

/// Why publishing the bundle failed.
#[derive(Debug, thiserror::Error)]
pub enum PublishFailure {
    #[error(transparent)]
    Read(#[from] WorkspaceError),

    #[error(transparent)]
    Upload(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("request rejected: {0}")]
    Rejected(#[from] RequestRejection),

    #[error("workspace setup failed: {0}")]
    Workspace(#[source] WorkspaceError),

    #[error("global style sheet generation failed: {0}")]
    Stylesheet(#[source] GenerationFailure),

    #[error("generating component `{component}` failed: {source}")]
    Component {
        component: String,
        #[source]
        source: GenerationFailure,
    },

    #[error("bundling failed: {0}")]
    Bundle(#[source] BundleError),

    #[error("publishing failed: {0}")]
    Publish(#[source] PublishFailure),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Rejected(_) => FailureKind::BadRequest,
            PipelineError::Workspace(_) => FailureKind::WorkspaceError,
            PipelineError::Stylesheet(_) => FailureKind::StylesheetError,
            PipelineError::Component { .. } => FailureKind::ComponentError,
            PipelineError::Bundle(_) => FailureKind::BundleError,
            PipelineError::Publish(_) => FailureKind::PublishError,
        }
    }

    /// The stage the build was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Rejected(_) => Stage::Validating,
            PipelineError::Workspace(_) | PipelineError::Stylesheet(_) => Stage::StylesheetGen,
            PipelineError::Component { .. } => Stage::ComponentGen,
            PipelineError::Bundle(_) => Stage::Bundling,
            PipelineError::Publish(_) => Stage::Publishing,
        }
    }

    /// Fixed text safe to return to the caller.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Rejected(rejection) => rejection.message(),
            PipelineError::Stylesheet(_) => STYLE_SHEET_FAILURE_MESSAGE,
            PipelineError::Workspace(_)
            | PipelineError::Component { .. }
            | PipelineError::Bundle(_)
            | PipelineError::Publish(_) => COMPONENT_FAILURE_MESSAGE,
        }
    }
}
