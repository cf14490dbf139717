//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Mode;

/// Build-and-publish server for generated UI packages
#[derive(Parser, Debug, Default)]
#[command(
    name = "fob-package-server",
    version,
    about = "Build and publish ESM packages from UI descriptions",
    long_about = "Accepts component descriptions over HTTP, generates their source,\n\
                  bundles the entry component and publishes the result under a\n\
                  fresh id."
)]
pub struct Cli {
    /// Port to listen on (overrides PORT and the config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Deployment mode
    ///
    /// `development` keeps workspaces in ./build and skips minification.
    /// `production` expects a host to embed the router and does not listen.
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Path to a TOML config file (default: ./fob-package.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "fob-package-server",
            "--port",
            "9000",
            "--mode",
            "development",
            "--config",
            "server.toml",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.mode, Some(Mode::Development));
        assert_eq!(cli.config, Some(PathBuf::from("server.toml")));
        assert!(cli.verbose);
        assert!(!cli.no_color);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["fob-package-server", "--mode", "staging"]).is_err());
    }
}
