//! platzi-dl CLI entrypoint

use anyhow::Result;
use clap::Parser;

use platzi_dl::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing is initialized per command (download runs also log to a file)
    let cli = Cli::parse();
    cli.execute().await
}
