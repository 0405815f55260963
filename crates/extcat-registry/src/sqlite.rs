//! The SQLite catalog: the sqlpkg.org index plus local overrides.

use std::{path::PathBuf, time::Duration};

use extcat_config::config::Config;
use extcat_dl::{
    http::fetch_json,
    transport::{Transport, UreqTransport},
};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{RegistryError, Result},
    local::parse_local_packages,
    output::{save_json, CatalogSummary},
};

pub const SQLITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pub url: String,
    pub local_packages: Option<PathBuf>,
    pub output: PathBuf,
}

impl SqliteCatalog {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            url: config.sqlite.url.clone(),
            local_packages: config.get_sqlite_local_packages()?,
            output: config.get_sqlite_output()?,
        })
    }

    /// Fetches the index, appends local overrides and writes the catalog.
    pub fn build(&self) -> Result<CatalogSummary> {
        self.build_with(&UreqTransport::new(SQLITE_TIMEOUT))
    }

    pub fn build_with<T: Transport>(&self, transport: &T) -> Result<CatalogSummary> {
        info!("Fetching SQLite packages from {}", self.url);

        let mut items: Vec<Value> = fetch_json(transport, &self.url)
            .map_err(|err| RegistryError::FailedToFetchRemote(err.to_string()))?;
        let remote = items.len();

        let local = match &self.local_packages {
            Some(path) => parse_local_packages(remote, path)?,
            None => Vec::new(),
        };
        let local_count = local.len();
        items.extend(local);

        save_json(&items, &self.output)?;

        Ok(CatalogSummary {
            remote,
            local: local_count,
            output: self.output.clone(),
        })
    }
}
