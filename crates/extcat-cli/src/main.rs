use clap::Parser;
use cli::{Args, Commands};
use extcat_config::{
    config::{config_path, generate_default_config, set_config_path, Config},
    error::ConfigError,
};
use extcat_dl::http_client::configure_http_client;
use extcat_utils::path::resolve_path;
use logging::setup_logging;
use tracing::debug;
use ureq::{http::HeaderMap, Proxy};
use utils::{parse_header, set_color};

use crate::error::{CliError, Result};

mod catalog;
mod cli;
mod error;
mod logging;
mod utils;

fn configure_http(args: &Args) -> Result<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(|proxy| {
            Proxy::new(proxy).map_err(|source| {
                CliError::InvalidProxy {
                    proxy: proxy.to_string(),
                    source,
                }
            })
        })
        .transpose()?;

    let headers = args
        .header
        .as_ref()
        .map(|headers| {
            headers
                .iter()
                .map(|header| parse_header(header))
                .collect::<Result<HeaderMap>>()
        })
        .transpose()?;

    let user_agent = args.user_agent.clone();

    configure_http_client(|config| {
        if proxy.is_some() {
            config.proxy = proxy;
        }
        if let Some(user_agent) = user_agent {
            config.user_agent = Some(user_agent);
        }
        if headers.is_some() {
            config.headers = headers;
        }
    });

    Ok(())
}

fn handle_cli() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        set_color(false);
    }

    if let Some(ref c) = args.config {
        set_config_path(resolve_path(c)?);
    }
    debug!("Using configuration at {}", config_path().display());

    configure_http(&args)?;

    if args.command == Commands::DefConfig {
        generate_default_config()?;
        return Ok(());
    }

    let config = Config::new()?;

    match args.command {
        Commands::Sync => catalog::sync(&config)?,
        Commands::Sqlite => catalog::build_sqlite(&config)?,
        Commands::Duckdb => catalog::build_duckdb(&config)?,
        Commands::RateLimit => catalog::show_rate_limit(&config)?,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
            print!("{rendered}");
        }
        Commands::DefConfig => {}
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
