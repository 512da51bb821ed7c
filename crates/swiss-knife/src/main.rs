//! swiss-knife: recursive calldata decoder and ABI encoder

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Logs on stderr, stdout only carries results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = cli::Cli::parse();
    tracing::debug!(?cli, "starting swiss-knife");
    cli::run(cli).await
}
