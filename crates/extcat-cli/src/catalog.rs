use extcat_config::config::Config;
use extcat_dl::client::RateLimitedClient;
use extcat_registry::{duckdb::client_config, CatalogSummary, DuckdbCatalog, SqliteCatalog};
use nu_ansi_term::Color::{Cyan, Green, Red};
use tracing::{error, info};

use crate::{
    error::{CliError, Result},
    utils::Colored,
};

fn report(name: &str, summary: &CatalogSummary) {
    info!(
        "{} {} entries ({} remote, {} local) written to {}",
        Colored(Green, name),
        summary.total(),
        summary.remote,
        summary.local,
        summary.output.display()
    );
}

pub fn build_sqlite(config: &Config) -> Result<()> {
    let summary = SqliteCatalog::from_config(config)?.build()?;
    report("sqlite", &summary);
    Ok(())
}

pub fn build_duckdb(config: &Config) -> Result<()> {
    let summary = DuckdbCatalog::from_config(config)?.build(client_config(config)?)?;
    report("duckdb", &summary);
    Ok(())
}

/// Builds every enabled catalog, continuing past failures.
pub fn sync(config: &Config) -> Result<()> {
    let mut failed = 0;

    let jobs: [(&str, bool, fn(&Config) -> Result<()>); 2] = [
        ("sqlite", config.sqlite.enabled, build_sqlite),
        ("duckdb", config.duckdb.enabled, build_duckdb),
    ];

    for (name, enabled, build) in jobs {
        if !enabled {
            info!("Skipping {} (disabled)", Colored(Cyan, name));
            continue;
        }

        if let Err(err) = build(config) {
            error!("{} catalog failed: {err}", Colored(Red, name));
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(CliError::CatalogsFailed(failed));
    }
    Ok(())
}

pub fn show_rate_limit(config: &Config) -> Result<()> {
    let mut client = RateLimitedClient::new(client_config(config)?);
    client
        .check_rate_limit()
        .map(|_| ())
        .ok_or(CliError::RateLimitUnavailable)
}
