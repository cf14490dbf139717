//! # fob-package-server
//!
//! HTTP front end for [`fob_package`]: configuration loading, logging and the
//! axum router around a [`fob_package::PackagePipeline`].
//!
//! Hosts that run their own listener can build the router directly:
//!
//! ```no_run
//! use fob_package_server::{ServerConfig, router};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::default();
//! let app = router(config.pipeline()?, config.body_limit);
//! # let _ = app;
//! # Ok(()) }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod server;

pub use cli::Cli;
pub use config::{Mode, ServerConfig};
pub use error::{Result, ServerError};
pub use server::{router, serve};

/// Prepare the workspace root, then serve unless the mode says a host owns
/// the listener.
pub async fn run(config: ServerConfig) -> Result<()> {
    let pipeline = config.pipeline()?;
    let workspace_root = config.workspace_root();
    pipeline
        .prepare()
        .await
        .map_err(|source| ServerError::Workspace {
            path: workspace_root.clone(),
            source,
        })?;

    tracing::info!(
        mode = ?config.mode,
        workspace_root = %workspace_root.display(),
        public_base_url = %config.public_base_url,
        "package pipeline ready"
    );

    let app = router(pipeline, config.body_limit);

    if !config.should_listen() {
        tracing::info!(
            "not binding a listener in {:?} mode; mount `router()` in the host process",
            config.mode
        );
        return Ok(());
    }

    serve(app, config.socket_addr()).await
}
