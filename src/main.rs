use anyhow::Result;
use cfkit::cli::Cli;
use cfkit::harness;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "cfkit=debug" } else { "cfkit=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // programs under test sit in their own process groups
    ctrlc::set_handler(|| {
        harness::kill_running();
        std::process::exit(130);
    })?;

    if cli.no_color {
        colored::control::set_override(false);
    }

    cli.run().await
}
