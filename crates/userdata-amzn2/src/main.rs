//! User data plugin for Amazon Linux 2.

mod provider;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use userdata_plugin::Plugin;

use crate::provider::Amzn2Provider;

/// Generates cloud-init user data for Amazon Linux 2 machines.
#[derive(Debug, Parser)]
#[command(name = "userdata-amzn2")]
struct Args {
    /// Enable plugin debug logging.
    #[arg(long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    // stdout carries the response; all logging goes to stderr.
    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let plugin = Plugin::new(Amzn2Provider, args.debug);
    if let Err(e) = plugin.run() {
        tracing::error!(error = %e, "failed to run Amazon Linux 2 user data plugin");
        std::process::exit(1);
    }
}
