//! Process-level errors.
//!
//! Request failures never reach this type; they are answered by the router.
//! `ServerError` covers what can stop the process itself: bad configuration,
//! an unusable workspace root or a listener that cannot be bound.

use std::net::SocketAddr;
use std::path::PathBuf;

use fob_package::GenerateError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(fob_package_server::config),
        help("Check fob-package.toml and FOB_PACKAGE_* environment variables")
    )]
    Config(#[source] Box<figment::Error>),

    #[error("Config file not found: {}", .0.display())]
    #[diagnostic(code(fob_package_server::config_not_found))]
    ConfigNotFound(PathBuf),

    #[error("Missing setting `{key}`")]
    #[diagnostic(code(fob_package_server::missing_setting))]
    MissingSetting {
        key: &'static str,
        #[help]
        hint: &'static str,
    },

    #[error("Failed to set up the code generator client: {0}")]
    #[diagnostic(code(fob_package_server::generator))]
    Generator(#[from] GenerateError),

    #[error("Failed to prepare workspace root {}: {source}", .path.display())]
    #[diagnostic(
        code(fob_package_server::workspace),
        help("Set `workspace_root` to a writable directory")
    )]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(fob_package_server::bind),
        help("Is another process already using this port? Try --port")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(fob_package_server::serve))]
    Serve(#[source] std::io::Error),
}

impl From<figment::Error> for ServerError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
