//! factwire - extract financial facts from crawled news articles.

use clap::Parser;
use factwire_cli::commands;
use factwire_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> factwire_cli::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await?,
        Command::Plan(args) => commands::execute_plan(args, &config, &formatter)?,
        Command::Fingerprint(args) => commands::execute_fingerprint(args, &config, &formatter)?,
    }

    Ok(())
}
