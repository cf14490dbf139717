//! # fob-package
//!
//! Build a published ESM bundle from a declarative UI description.
//!
//! A build takes an entry component name, a list of component descriptions and
//! optional shared styles. It generates a global stylesheet when one is
//! needed, then generates each component and bundles the entry module with
//! every framework and third-party package left external. Finally it uploads
//! the result under a fresh id.
//!
//! Code generation, bundling and storage are collaborators behind traits, so
//! the orchestration in [`PackagePipeline`] can run against remote services,
//! a local bundler or the in-memory fakes in `test_utils`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fob_package::{
//!     BundleSettings, LocalObjectStore, PackagePipeline, PackageRequest, PipelineConfig,
//!     PipelineServices, RemoteGenerator, RolldownBundler, StructuralNormalizer,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = Arc::new(RemoteGenerator::new("http://localhost:5000", Duration::from_secs(30))?);
//! let pipeline = PackagePipeline::new(
//!     PipelineServices {
//!         normalizer: Arc::new(StructuralNormalizer),
//!         style_sheets: generator.clone(),
//!         components: generator,
//!         bundler: Arc::new(RolldownBundler),
//!         store: Arc::new(LocalObjectStore::new("./packages")),
//!     },
//!     PipelineConfig {
//!         workspace_root: std::env::temp_dir().join("build"),
//!         public_base_url: "https://cdn.example.com/".into(),
//!         bundle: BundleSettings::default(),
//!     },
//! );
//!
//! let request = PackageRequest::from_slice(br#"{"entry":"home","components":[]}"#)?;
//! let package = pipeline.build(request).await?;
//! println!("{}", package.url);
//! # Ok(()) }
//! ```

pub mod bundler;
pub mod css;
pub mod deps;
pub mod description;
pub mod error;
pub mod generator;
pub mod naming;
pub mod normalize;
pub mod pipeline;
pub mod remote;
pub mod store;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use bundler::{
    BundleError, BundleRequest, BundleSettings, Bundler, BundlerEngine, EsbuildBundler,
    RolldownBundler,
};
pub use css::{InlineStylePlugin, StyleModuleError};
pub use deps::{BASELINE_EXTERNALS, DependencySet};
pub use description::{
    ComponentDescription, DesignLanguage, NormalizedDescription, PackageRequest,
    RequestRejection, StyleSetDefinitions, ValidatedRequest,
};
pub use error::{FailureKind, PipelineError, Stage};
pub use generator::{
    ComponentGenerator, FileType, GenerateError, GeneratedFile, GenerationOptions,
    GeneratorOutput, StyleSheetGenerator,
};
pub use naming::camel_case_to_dash_case;
pub use normalize::{Normalizer, StructuralNormalizer, ValidationError};
pub use pipeline::{PackagePipeline, PipelineConfig, PipelineServices};
pub use remote::RemoteGenerator;
pub use store::{HttpObjectStore, LocalObjectStore, ObjectStore, PublishedPackage, StoreError};
pub use workspace::{Workspace, WorkspaceError};
