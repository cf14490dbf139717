//! Server configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `fob-package.toml` (or the file given with `--config`)
//! 3. `NODE_ENV`, for `mode` only (`development` or `production`; other
//!    values are ignored)
//! 4. `FOB_PACKAGE_*` environment variables, nested keys split on `__`
//!    (`FOB_PACKAGE_STORAGE__BACKEND=http`)
//! 5. the bare `PORT` variable
//! 6. command-line flags

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use fob_package::{
    BundleSettings, Bundler, BundlerEngine, EsbuildBundler, HttpObjectStore, LocalObjectStore,
    ObjectStore, PackagePipeline, PipelineConfig, PipelineServices, RemoteGenerator,
    RolldownBundler, StructuralNormalizer,
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{Result, ServerError};

/// Config file picked up from the working directory.
pub const CONFIG_FILE: &str = "fob-package.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "FOB_PACKAGE_";

/// Conventional deployment variable, read as a fallback for `mode`.
pub const NODE_ENV: &str = "NODE_ENV";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://jscdn.teleporthq.io/";

/// Deployment mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local work: workspaces under `./build`, readable bundles.
    Development,
    /// Self-hosted service.
    #[default]
    Standalone,
    /// Embedded in a host that dispatches requests to the router.
    Production,
}

impl Mode {
    pub fn minify(self) -> bool {
        !matches!(self, Mode::Development)
    }

    pub fn default_workspace_root(self) -> PathBuf {
        match self {
            Mode::Development => PathBuf::from("./build"),
            Mode::Standalone | Mode::Production => std::env::temp_dir().join("build"),
        }
    }

    pub fn listens_by_default(self) -> bool {
        !matches!(self, Mode::Production)
    }

    /// Mode named by a `NODE_ENV` value. Only `development` and `production`
    /// map to a mode; anything else (`test`, `staging`, ...) is `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fob_package_server::Mode;
    ///
    /// assert_eq!(Mode::from_node_env("production"), Some(Mode::Production));
    /// assert_eq!(Mode::from_node_env("test"), None);
    /// ```
    pub fn from_node_env(value: &str) -> Option<Self> {
        match value.trim() {
            "development" => Some(Mode::Development),
            "production" => Some(Mode::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: IpAddr,
    pub mode: Mode,
    /// Force binding a listener on or off, regardless of `mode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<bool>,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
    /// Parent of per-request workspaces. Derived from `mode` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    pub public_base_url: String,
    pub generator: GeneratorConfig,
    pub bundler: BundlerConfig,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            mode: Mode::default(),
            listen: None,
            body_limit: DEFAULT_BODY_LIMIT,
            workspace_root: None,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            generator: GeneratorConfig::default(),
            bundler: BundlerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Remote code generator service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3001".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    pub engine: BundlerEngine,
    /// Executable used when `engine = "esbuild"`.
    pub esbuild_path: PathBuf,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            engine: BundlerEngine::default(),
            esbuild_path: PathBuf::from("esbuild"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
}

/// Where published bundles are uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Target directory of the `local` backend.
    pub dir: PathBuf,
    /// Base URL of the `http` backend; objects go to `{endpoint}/{id}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dir: PathBuf::from("./packages"),
            endpoint: None,
            token: None,
        }
    }
}

/// Flags that override every other source.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<Mode>,
}

impl ServerConfig {
    /// Load configuration for the process described by `cli`.
    pub fn load(cli: &Cli) -> Result<Self> {
        if let Some(path) = cli.config.as_ref().filter(|path| !path.exists()) {
            return Err(ServerError::ConfigNotFound(path.clone()));
        }

        let config: Self = Self::figment(cli.config.as_deref())
            .merge(Serialized::defaults(CliOverrides {
                port: cli.port,
                mode: cli.mode,
            }))
            .extract()?;

        tracing::debug!(
            mode = ?config.mode,
            port = config.port,
            storage = ?config.storage.backend,
            bundler = ?config.bundler.engine,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Every source below the command line.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = config_path.map(Path::to_path_buf).or_else(|| {
            let default_path = Path::new(CONFIG_FILE);
            default_path.exists().then(|| default_path.to_path_buf())
        });
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        let node_env = std::env::var(NODE_ENV).ok();
        if let Some(mode) = node_env.as_deref().and_then(Mode::from_node_env) {
            figment = figment.merge(Serialized::default("mode", mode));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["PORT"]))
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| self.mode.default_workspace_root())
    }

    pub fn should_listen(&self) -> bool {
        self.listen.unwrap_or_else(|| self.mode.listens_by_default())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workspace_root: self.workspace_root(),
            public_base_url: self.public_base_url.clone(),
            bundle: BundleSettings::new(self.mode.minify()),
        }
    }

    /// Build the production collaborators.
    ///
    /// Generation always goes through [`RemoteGenerator`] at
    /// `generator.url`. The bundler follows `bundler.engine` and the store
    /// follows `storage.backend`.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Generator`] if the HTTP client cannot be built.
    /// - [`ServerError::MissingSetting`] for the `http` storage backend
    ///   without `storage.endpoint`.
    pub fn services(&self) -> Result<PipelineServices> {
        let generator = Arc::new(RemoteGenerator::new(
            self.generator.url.clone(),
            Duration::from_secs(self.generator.timeout_secs),
        )?);

        let bundler: Arc<dyn Bundler> = match self.bundler.engine {
            BundlerEngine::Rolldown => Arc::new(RolldownBundler::new()),
            BundlerEngine::Esbuild => Arc::new(EsbuildBundler::new(&self.bundler.esbuild_path)),
        };

        let store: Arc<dyn ObjectStore> = match self.storage.backend {
            StorageBackend::Local => Arc::new(LocalObjectStore::new(&self.storage.dir)),
            StorageBackend::Http => {
                let endpoint =
                    self.storage
                        .endpoint
                        .clone()
                        .ok_or(ServerError::MissingSetting {
                            key: "storage.endpoint",
                            hint: "The http storage backend needs an upload endpoint",
                        })?;
                Arc::new(HttpObjectStore::new(endpoint, self.storage.token.clone()))
            }
        };

        Ok(PipelineServices {
            normalizer: Arc::new(StructuralNormalizer::new()),
            style_sheets: generator.clone(),
            components: generator,
            bundler,
            store,
        })
    }

    pub fn pipeline(&self) -> Result<PackagePipeline> {
        Ok(PackagePipeline::new(self.services()?, self.pipeline_config()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.mode, Mode::Standalone);
        assert_eq!(config.body_limit, 2 * 1024 * 1024);
        assert!(config.should_listen());
        assert!(config.pipeline_config().bundle.minify_whitespace);
        assert_eq!(config.workspace_root(), std::env::temp_dir().join("build"));
    }

    #[test]
    fn test_mode_semantics() {
        let development = ServerConfig {
            mode: Mode::Development,
            ..ServerConfig::default()
        };
        assert_eq!(development.workspace_root(), PathBuf::from("./build"));
        assert!(!development.pipeline_config().bundle.minify_whitespace);

        let production = ServerConfig {
            mode: Mode::Production,
            ..ServerConfig::default()
        };
        assert!(!production.should_listen());

        let forced = ServerConfig {
            listen: Some(true),
            ..production
        };
        assert!(forced.should_listen());
    }

    #[test]
    fn test_layered_sources() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                    port = 7000
                    mode = "development"
                    public_base_url = "https://cdn.example.com/"

                    [storage]
                    backend = "http"
                    endpoint = "https://storage.example.com"
                "#,
            )?;
            jail.set_env("FOB_PACKAGE_GENERATOR__TIMEOUT_SECS", "5");
            jail.set_env("PORT", "7100");

            let config: ServerConfig = ServerConfig::figment(None).extract()?;
            assert_eq!(config.port, 7100);
            assert_eq!(config.mode, Mode::Development);
            assert_eq!(config.public_base_url, "https://cdn.example.com/");
            assert_eq!(config.generator.timeout_secs, 5);
            assert_eq!(config.storage.backend, StorageBackend::Http);
            assert_eq!(
                config.storage.endpoint.as_deref(),
                Some("https://storage.example.com")
            );
            Ok(())
        });
    }

    #[test]
    fn test_cli_flags_win() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "7100");
            jail.set_env("FOB_PACKAGE_MODE", "production");

            let cli = Cli {
                port: Some(9000),
                mode: Some(Mode::Development),
                ..Cli::default()
            };
            let config = ServerConfig::load(&cli).map_err(|e| e.to_string())?;
            assert_eq!(config.port, 9000);
            assert_eq!(config.mode, Mode::Development);
            Ok(())
        });
    }

    #[test]
    fn test_node_env_selects_mode() {
        Jail::expect_with(|jail| {
            jail.set_env("NODE_ENV", "development");
            let config: ServerConfig = ServerConfig::figment(None).extract()?;
            assert_eq!(config.mode, Mode::Development);
            assert!(!config.pipeline_config().bundle.minify_whitespace);

            jail.set_env("NODE_ENV", "production");
            let config: ServerConfig = ServerConfig::figment(None).extract()?;
            assert_eq!(config.mode, Mode::Production);
            assert!(!config.should_listen());
            Ok(())
        });
    }

    #[test]
    fn test_node_env_is_below_prefixed_mode() {
        Jail::expect_with(|jail| {
            jail.set_env("NODE_ENV", "production");
            jail.set_env("FOB_PACKAGE_MODE", "standalone");
            let config: ServerConfig = ServerConfig::figment(None).extract()?;
            assert_eq!(config.mode, Mode::Standalone);
            Ok(())
        });
    }

    #[test]
    fn test_node_env_overrides_config_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, r#"mode = "standalone""#)?;
            jail.set_env("NODE_ENV", "development");
            let config: ServerConfig = ServerConfig::figment(None).extract()?;
            assert_eq!(config.mode, Mode::Development);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_node_env_is_ignored() {
        Jail::expect_with(|jail| {
            jail.set_env("NODE_ENV", "test");
            let config = ServerConfig::load(&Cli::default()).map_err(|e| e.to_string())?;
            assert_eq!(config.mode, Mode::Standalone);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        Jail::expect_with(|jail| {
            jail.set_env("FOB_PACKAGE_MODE", "staging");

            let err = ServerConfig::load(&Cli::default()).unwrap_err();
            assert!(matches!(err, ServerError::Config(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..Cli::default()
        };
        assert!(matches!(
            ServerConfig::load(&cli),
            Err(ServerError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_http_storage_requires_endpoint() {
        let config = ServerConfig {
            storage: StorageConfig {
                backend: StorageBackend::Http,
                ..StorageConfig::default()
            },
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.services(),
            Err(ServerError::MissingSetting { key: "storage.endpoint", .. })
        ));
    }
}
