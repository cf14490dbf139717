use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::Instrument;

use crate::bundler::{BundleRequest, BundleSettings, Bundler};
use crate::deps::DependencySet;
use crate::description::{DesignLanguage, RootDescription, StyleSetDefinitions, ValidatedRequest};
use crate::error::{GenerationFailure, PipelineError, PublishFailure};
use crate::generator::{GenerateError, GenerationOptions};
use crate::store::{ObjectStore, PublishedPackage, package_id, package_url};
use crate::workspace::Workspace;

use super::PipelineServices;

/// Shared styles every component is generated against.
#[derive(Debug, Clone)]
pub(super) struct ResolvedStyles {
    pub style_set_definitions: StyleSetDefinitions,
    pub design_language: DesignLanguage,
    /// Written global stylesheet, if one was generated.
    pub style_sheet: Option<PathBuf>,
}

impl ResolvedStyles {
    fn options(&self) -> GenerationOptions {
        GenerationOptions::component(
            self.style_set_definitions.clone(),
            self.design_language.clone(),
            self.style_sheet.is_some(),
        )
    }
}

pub(super) async fn style_sheet(
    services: &PipelineServices,
    request: &ValidatedRequest,
    workspace: &Workspace,
    deps: &mut DependencySet,
) -> Result<ResolvedStyles, PipelineError> {
    resolve_styles(services, request, workspace, deps)
        .await
        .map_err(PipelineError::Stylesheet)
}

async fn resolve_styles(
    services: &PipelineServices,
    request: &ValidatedRequest,
    workspace: &Workspace,
    deps: &mut DependencySet,
) -> Result<ResolvedStyles, GenerationFailure> {
    let root = RootDescription::new(&request.design_language, &request.style_set_definitions);
    let root = services.normalizer.normalize(root.as_value()).await?;

    let mut styles = ResolvedStyles {
        style_set_definitions: root.style_set_definitions(),
        design_language: root.design_language(),
        style_sheet: None,
    };

    if !request.needs_stylesheet() {
        tracing::debug!("no tokens or style sets, skipping global style sheet");
        return Ok(styles);
    }

    let output = services
        .style_sheets
        .generate_style_sheet(&root, &GenerationOptions::root())
        .await?;
    let file = output.files.first().ok_or(GenerateError::NoFiles)?;
    styles.style_sheet = Some(workspace.write(file).await?);
    deps.merge(&output);

    Ok(styles)
}

pub(super) async fn components(
    services: &PipelineServices,
    request: &ValidatedRequest,
    styles: &ResolvedStyles,
    workspace: &Workspace,
    deps: &mut DependencySet,
) -> Result<(), PipelineError> {
    let options = styles.options();
    let mut written: HashSet<PathBuf> = styles.style_sheet.iter().cloned().collect();

    for component in &request.components {
        let name = component.name();

        generate_component(services, component.as_value(), &options, workspace, deps, &mut written)
            .instrument(tracing::debug_span!("component", component = name))
            .await
            .map_err(|source| PipelineError::Component {
                component: name.to_string(),
                source,
            })?;
    }
    Ok(())
}

async fn generate_component(
    services: &PipelineServices,
    raw: &serde_json::Value,
    options: &GenerationOptions,
    workspace: &Workspace,
    deps: &mut DependencySet,
    written: &mut HashSet<PathBuf>,
) -> Result<(), GenerationFailure> {
    let component = services.normalizer.normalize(raw).await?;
    let output = services
        .components
        .generate_component(&component, options)
        .await?;

    for file in &output.files {
        let path = workspace.write(file).await?;
        if !written.insert(path.clone()) {
            tracing::warn!(path = %path.display(), "generated file overwrote an earlier one");
        }
    }
    deps.merge(&output);
    Ok(())
}

pub(super) async fn bundle(
    bundler: &dyn Bundler,
    request: &ValidatedRequest,
    workspace: &Workspace,
    deps: &DependencySet,
    settings: &BundleSettings,
) -> Result<PathBuf, PipelineError> {
    let bundle = BundleRequest {
        entry: workspace.entry_path(&request.entry),
        cwd: workspace.path().to_path_buf(),
        outfile: workspace.bundle_path(),
        external: deps.externals(),
        settings: settings.clone(),
    };

    bundler
        .bundle(&bundle)
        .await
        .map_err(PipelineError::Bundle)?;
    Ok(bundle.outfile)
}

pub(super) async fn publish(
    store: &dyn ObjectStore,
    workspace: &Workspace,
    bundle: &Path,
    entry: &str,
    base_url: &str,
) -> Result<PublishedPackage, PipelineError> {
    let bytes = workspace
        .read(bundle)
        .await
        .map_err(|e| PipelineError::Publish(PublishFailure::Read(e)))?;

    let id = package_id(entry);
    store
        .put(&id, bytes)
        .await
        .map_err(|e| PipelineError::Publish(PublishFailure::Upload(e)))?;

    Ok(PublishedPackage {
        url: package_url(base_url, &id),
        id,
    })
}
