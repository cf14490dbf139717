//! Build orchestration.
//!
//! A build runs these stages in order. It stops at the first failure and never
//! retries:
//!
//! ```text
//! Validating -> StylesheetGen -> ComponentGen -> Bundling -> Publishing -> Done
//! ```
//!
//! Every build past validation owns a fresh [`Workspace`] under the configured
//! root. The workspace is removed once the build reaches a terminal state,
//! whether it succeeded or failed, and also when the build future is dropped
//! before finishing.

mod stages;


use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;

use crate::bundler::{BundleSettings, Bundler};
use crate::deps::DependencySet;
use crate::description::{PackageRequest, ValidatedRequest};
use crate::error::{PipelineError, Stage};
use crate::generator::{ComponentGenerator, StyleSheetGenerator};
use crate::normalize::Normalizer;
use crate::store::{ObjectStore, PublishedPackage};
use crate::workspace::{self, Workspace};

/// Collaborators used by every build.
#[derive(Clone)]
pub struct PipelineServices {
    pub normalizer: Arc<dyn Normalizer>,
    pub style_sheets: Arc<dyn StyleSheetGenerator>,
    pub components: Arc<dyn ComponentGenerator>,
    pub bundler: Arc<dyn Bundler>,
    pub store: Arc<dyn ObjectStore>,
}

/// Deployment settings shared by every build.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent of all per-request workspaces.
    pub workspace_root: PathBuf,
    /// Prefix of every published URL.
    pub public_base_url: String,
    pub bundle: BundleSettings,
}

/// Runs builds. Cheap to clone; clones share services and configuration.
#[derive(Clone)]
pub struct PackagePipeline {
    services: PipelineServices,
    config: Arc<PipelineConfig>,
}

impl PackagePipeline {
    pub fn new(services: PipelineServices, config: PipelineConfig) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Create the workspace root ahead of the first request.
    pub async fn prepare(&self) -> std::io::Result<()> {
        workspace::ensure(&self.config.workspace_root).await
    }

    /// Validate `request` and build it.
    ///
    /// # Errors
    ///
    /// A [`PipelineError`] naming the stage that failed. Rejected requests
    /// fail before a workspace is created; every other failure happens after
    /// it and the workspace is still removed.
    pub async fn build(&self, request: PackageRequest) -> Result<PublishedPackage, PipelineError> {
        let request = match request.validate() {
            Ok(request) => request,
            Err(rejection) => {
                tracing::info!(stage = %Stage::Validating, %rejection, "request rejected");
                return Err(rejection.into());
            }
        };
        self.build_validated(request).await
    }

    /// Build a request that already passed validation.
    pub async fn build_validated(
        &self,
        request: ValidatedRequest,
    ) -> Result<PublishedPackage, PipelineError> {
        let span = tracing::info_span!(
            "build_package",
            entry = %request.entry,
            components = request.components.len(),
            workspace = tracing::field::Empty,
        );

        async {
            let workspace = Workspace::create(&self.config.workspace_root)
                .await
                .map_err(PipelineError::Workspace)
                .inspect_err(report)?;
            tracing::Span::current().record(
                "workspace",
                tracing::field::display(workspace.path().display()),
            );

            let result = self.run(&request, &workspace).await;
            workspace.destroy().await;

            match &result {
                Ok(package) => {
                    tracing::info!(
                        stage = %Stage::Done,
                        id = %package.id,
                        url = %package.url,
                        "package published"
                    );
                }
                Err(e) => report(e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &ValidatedRequest,
        workspace: &Workspace,
    ) -> Result<PublishedPackage, PipelineError> {
        let mut deps = DependencySet::new();

        tracing::info!(stage = %Stage::StylesheetGen, "resolving shared styles");
        let styles = stages::style_sheet(&self.services, request, workspace, &mut deps).await?;

        tracing::info!(stage = %Stage::ComponentGen, "generating components");
        stages::components(&self.services, request, &styles, workspace, &mut deps).await?;

        tracing::info!(stage = %Stage::Bundling, externals = deps.len(), "bundling");
        let bundle = stages::bundle(
            self.services.bundler.as_ref(),
            request,
            workspace,
            &deps,
            &self.config.bundle,
        )
        .await?;

        tracing::info!(stage = %Stage::Publishing, "publishing bundle");
        stages::publish(
            self.services.store.as_ref(),
            workspace,
            &bundle,
            &request.entry,
            &self.config.public_base_url,
        )
        .await
    }
}

fn report(err: &PipelineError) {
    tracing::error!(
        stage = %err.stage(),
        kind = ?err.kind(),
        error = %err,
        "build failed"
    );
}
