use anyhow::Result;
use clap::Parser;
use fuelsplit::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.run().await
}

/// Logs go to stderr; stdout carries the replies.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "fuelsplit=debug"
    } else {
        "fuelsplit=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
