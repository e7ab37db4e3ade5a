use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser as _;
use portal_core::{ApiError, FileTokenStore, Portal, PortalConfig, UreqTransport};
use tracing::debug;

mod args;
mod commands;

use args::Cli;

fn main() {
    if let Err(error) = run() {
        match error.downcast_ref::<ApiError>() {
            Some(api) => eprintln!("{}: {api}", api.title()),
            None => eprintln!("portal error: {error:#}"),
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = PortalConfig::load(&cli.config)
        .with_context(|| format!("failed to load config `{}`", cli.config))?;
    init_tracing(&config, cli.verbose)?;

    let token_file = match &config.token_file {
        Some(path) => path.clone(),
        None => default_token_file()?,
    };
    debug!(api_url = %config.api_url, token_file = %token_file.display(), "starting");

    let transport = UreqTransport::new(config.timeout);
    let mut portal = Portal::new(&config, transport, FileTokenStore::new(token_file))?;

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    commands::dispatch(cli.command, &mut portal, &mut stdin, &mut stdout)
}

fn init_tracing(config: &PortalConfig, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.log.level.into()
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn default_token_file() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".portal").join("session.json"))
}
