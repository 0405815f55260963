//! Extension catalog builders for extcat.
//!
//! Two catalogs are produced, each a JSON array of entries:
//! - **SQLite** ([`sqlite`]): the sqlpkg.org package index, fetched in one request.
//! - **DuckDB** ([`duckdb`]): one record per community extension, assembled from the
//!   `description.yml` files of the `duckdb/community-extensions` repository through the
//!   rate-limited GitHub client.
//!
//! Both append hand-maintained entries from a local YAML file ([`local`]) with ids that
//! continue after the remote ones, then write the result with [`save_json`].
//!
//! # Example
//!
//! ```no_run
//! use extcat_config::config::Config;
//! use extcat_registry::{duckdb::client_config, DuckdbCatalog};
//!
//! fn refresh(config: &Config) -> extcat_registry::Result<()> {
//!     let summary = DuckdbCatalog::from_config(config)?.build(client_config(config)?)?;
//!     println!("{} entries written to {}", summary.total(), summary.output.display());
//!     Ok(())
//! }
//! ```

pub mod duckdb;
pub mod error;
pub mod local;
pub mod output;
pub mod package;
pub mod sqlite;

pub use duckdb::DuckdbCatalog;
pub use error::{ErrorContext, RegistryError, Result};
pub use local::parse_local_packages;
pub use output::{save_json, CatalogSummary};
pub use package::{DescriptionFile, ExtensionRecord};
pub use sqlite::SqliteCatalog;
