//! Bundling collaborators.
//!
//! A [`Bundler`] turns the entry module in a workspace (plus everything it
//! imports from the same directory) into one combined ESM file. Packages in
//! the request's exclusion list stay as bare imports. Imported style sheets
//! are inlined into the bundle (see [`crate::css`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rolldown::{
    BundlerBuilder, BundlerOptions, InputItem, IsExternal, OutputFormat, Platform,
    RawMinifyOptions,
};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;
use serde::{Deserialize, Serialize};

use crate::css::{InlineStylePlugin, StyleModuleError, inline_style_sheets};

/// Fixed build parameters shared by every bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSettings {
    /// Strip whitespace from the output. Off in development.
    pub minify_whitespace: bool,
    /// Minimum ECMAScript level of the output.
    pub target: &'static str,
    /// Factory used for JSX fragments.
    pub jsx_fragment: &'static str,
}

impl BundleSettings {
    pub const TARGET: &'static str = "es2016";
    pub const JSX_FRAGMENT: &'static str = "Fragment";

    pub fn new(minify_whitespace: bool) -> Self {
        Self {
            minify_whitespace,
            target: Self::TARGET,
            jsx_fragment: Self::JSX_FRAGMENT,
        }
    }
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

/// One bundler invocation.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Entry module, inside `cwd`.
    pub entry: PathBuf,
    /// Directory holding the generated sources.
    pub cwd: PathBuf,
    /// Where the combined output must be written.
    pub outfile: PathBuf,
    /// Package names left as bare imports.
    pub external: Vec<String>,
    pub settings: BundleSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("entry file not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    #[error("bundler failed: {0}")]
    Engine(String),

    #[error("bundle produced no entry chunk")]
    NoEntryChunk,

    #[error(transparent)]
    Style(#[from] StyleModuleError),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to write bundle {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundle `request.entry` into `request.outfile`.
    async fn bundle(&self, request: &BundleRequest) -> Result<(), BundleError>;
}

/// Which bundler implementation the server uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundlerEngine {
    #[default]
    Rolldown,
    Esbuild,
}

async fn ensure_entry(entry: &Path) -> Result<(), BundleError> {
    match tokio::fs::metadata(entry).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(BundleError::EntryNotFound(entry.to_path_buf())),
    }
}

/// In-process bundling with Rolldown.
///
/// JSX is lowered by Rolldown's transformer and the output language level is
/// Rolldown's default; `target` and `jsx_fragment` only apply to the esbuild
/// engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownBundler;

impl RolldownBundler {
    pub fn new() -> Self {
        Self
    }

    fn options(request: &BundleRequest) -> BundlerOptions {
        BundlerOptions {
            input: Some(vec![InputItem {
                name: None,
                import: request.entry.to_string_lossy().into_owned(),
            }]),
            cwd: Some(request.cwd.clone()),
            format: Some(OutputFormat::Esm),
            platform: Some(Platform::Browser),
            external: Some(IsExternal::from(request.external.clone())),
            minify: request
                .settings
                .minify_whitespace
                .then(|| RawMinifyOptions::from(true)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Bundler for RolldownBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<(), BundleError> {
        ensure_entry(&request.entry).await?;

        let plugins: Vec<SharedPluginable> = vec![Arc::new(InlineStylePlugin::new(
            request.settings.minify_whitespace,
        ))];

        let mut bundler = BundlerBuilder::default()
            .with_options(Self::options(request))
            .with_plugins(plugins)
            .build()
            .map_err(|e| BundleError::Engine(format!("{e:?}")))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| BundleError::Engine(format!("{e:?}")))?;

        let code = output
            .assets
            .iter()
            .find_map(|asset| match asset {
                Output::Chunk(chunk) if chunk.is_entry => Some(chunk.code.clone()),
                _ => None,
            })
            .ok_or(BundleError::NoEntryChunk)?;

        tokio::fs::write(&request.outfile, code.as_bytes())
            .await
            .map_err(|source| BundleError::Write {
                path: request.outfile.clone(),
                source,
            })
    }
}

/// Bundling through an `esbuild` executable.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    program: PathBuf,
}

impl EsbuildBundler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one invocation.
    ///
    /// `.css` files are loaded as JavaScript; [`Bundler::bundle`] rewrites them
    /// into style-injecting modules first.
    pub fn args(request: &BundleRequest) -> Vec<String> {
        let settings = &request.settings;
        let mut args = vec![
            request.entry.to_string_lossy().into_owned(),
            "--bundle".to_string(),
            format!("--outfile={}", request.outfile.display()),
            "--format=esm".to_string(),
            "--jsx=transform".to_string(),
            format!("--jsx-fragment={}", settings.jsx_fragment),
            format!("--target={}", settings.target),
            "--platform=browser".to_string(),
            "--loader:.css=js".to_string(),
            "--log-level=error".to_string(),
        ];
        if settings.minify_whitespace {
            args.push("--minify-whitespace".to_string());
        }
        args.extend(request.external.iter().map(|name| format!("--external:{name}")));
        args
    }
}

impl Default for EsbuildBundler {
    fn default() -> Self {
        Self::new("esbuild")
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    async fn bundle(&self, request: &BundleRequest) -> Result<(), BundleError> {
        ensure_entry(&request.entry).await?;
        let inlined = inline_style_sheets(&request.cwd, request.settings.minify_whitespace).await?;
        tracing::debug!(style_sheets = inlined, "inlined style sheets for esbuild");

        let program = self.program.display().to_string();
        let output = tokio::process::Command::new(&self.program)
            .args(Self::args(request))
            .current_dir(&request.cwd)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BundleError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BundleError::Exit {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &Path, minify: bool) -> BundleRequest {
        BundleRequest {
            entry: dir.join("home.jsx"),
            cwd: dir.to_path_buf(),
            outfile: dir.join("bundle.js"),
            external: vec!["react".to_string(), "prop-types".to_string()],
            settings: BundleSettings::new(minify),
        }
    }

    #[test]
    fn test_esbuild_args() {
        let args = EsbuildBundler::args(&request(Path::new("/tmp/ws"), true));

        assert_eq!(args[0], "/tmp/ws/home.jsx");
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--outfile=/tmp/ws/bundle.js".to_string()));
        assert!(args.contains(&"--format=esm".to_string()));
        assert!(args.contains(&"--jsx=transform".to_string()));
        assert!(args.contains(&"--jsx-fragment=Fragment".to_string()));
        assert!(args.contains(&"--target=es2016".to_string()));
        assert!(args.contains(&"--platform=browser".to_string()));
        assert!(args.contains(&"--loader:.css=js".to_string()));
        assert!(args.contains(&"--minify-whitespace".to_string()));
        assert!(args.contains(&"--external:react".to_string()));
        assert!(args.contains(&"--external:prop-types".to_string()));
    }

    #[test]
    fn test_esbuild_args_development() {
        let args = EsbuildBundler::args(&request(Path::new("/tmp/ws"), false));
        assert!(!args.contains(&"--minify-whitespace".to_string()));
    }

    #[test]
    fn test_rolldown_options() {
        let options = RolldownBundler::options(&request(Path::new("/tmp/ws"), false));

        assert!(matches!(options.format, Some(OutputFormat::Esm)));
        assert!(matches!(options.platform, Some(Platform::Browser)));
        assert!(options.minify.is_none());
        assert_eq!(options.input.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_missing_entry_is_reported() {
        let temp = TempDir::new().unwrap();
        let err = RolldownBundler
            .bundle(&request(temp.path(), true))
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::EntryNotFound(_)));

        let err = EsbuildBundler::default()
            .bundle(&request(temp.path(), true))
            .await
            .unwrap_err();
        assert!(matches!(err, BundleError::EntryNotFound(_)));
    }

    #[tokio::test]
    async fn test_rolldown_bundles_local_imports() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("button.jsx"),
            "export default function Button() { return 'button'; }\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("home.jsx"),
            "import Button from './button.jsx';\nexport default function Home() { return Button(); }\n",
        )
        .unwrap();

        let request = request(temp.path(), false);
        RolldownBundler.bundle(&request).await.unwrap();

        let code = std::fs::read_to_string(&request.outfile).unwrap();
        assert!(code.contains("function Button"));
    }

    #[tokio::test]
    async fn test_rolldown_inlines_imported_style_sheets() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("style.css"), ":root { --brand: #123456; }\n").unwrap();
        std::fs::write(
            temp.path().join("card.module.css"),
            ".card-title { margin-top: 3px; }\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("home.jsx"),
            concat!(
                "import './style.css';\n",
                "import classes from './card.module.css';\n",
                "export default function Home() { return classes.cardTitle; }\n",
            ),
        )
        .unwrap();

        let request = request(temp.path(), false);
        RolldownBundler.bundle(&request).await.unwrap();

        let code = std::fs::read_to_string(&request.outfile).unwrap();
        assert!(code.contains("--brand: #123456"));
        assert!(code.contains("margin-top: 3px"));
        assert!(code.contains("cardTitle"));
        assert!(code.contains("createElement(\"style\")"));
        assert!(!code.contains("import './style.css'"));
    }
}
