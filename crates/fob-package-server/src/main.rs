//! Package server entry point.

use clap::Parser;
use fob_package_server::{Cli, ServerConfig, logger};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose, cli.no_color);

    let config = ServerConfig::load(&cli)?;
    fob_package_server::run(config).await?;
    Ok(())
}
