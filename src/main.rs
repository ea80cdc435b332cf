use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bzmat::app::App;
use bzmat::config::{CliArgs, ToolConfig};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Logs go to stderr so command output stays pipeable
    let filter = if args.verbose {
        EnvFilter::new("bzmat=debug")
    } else {
        EnvFilter::new("bzmat=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config: ToolConfig = args.into();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match App::run(&config, &mut out) {
        Ok(summary) => {
            eprintln!(
                "Done: {} materials, {} bytes",
                summary.materials, summary.bytes
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "Command failed");
            Err(anyhow::anyhow!(e)).context("bzmat command failed")
        }
    }
}
