use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use documented::{Documented, DocumentedFields};
use extcat_utils::{
    path::{resolve_path, xdg_config_home},
    time::parse_std_duration,
};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
};

pub const SQLPKG_URL: &str = "https://sqlpkg.org/data/packages.json";
pub const DUCKDB_TREE_URL: &str = "https://api.github.com/repos/duckdb/community-extensions/git/trees/86761d118e803aeafd02ad4aac735d95fa81d301";

/// Application's configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct Config {
    /// Directory where generated catalogs are written.
    /// Relative catalog file names are resolved against it.
    /// Default: ./json
    pub output_dir: String,

    /// SQLite extension catalog.
    pub sqlite: SqliteSource,

    /// DuckDB community extension catalog.
    pub duckdb: DuckdbSource,

    /// GitHub API client settings.
    pub github: GithubSettings,
}

/// SQLite catalog source
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct SqliteSource {
    /// Whether `extcat sync` builds this catalog.
    pub enabled: bool,

    /// URL of the upstream package index (a JSON array).
    pub url: String,

    /// YAML file with packages appended after the upstream ones.
    pub local_packages: String,

    /// Output file name.
    pub output: String,
}

/// DuckDB catalog source
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct DuckdbSource {
    /// Whether `extcat sync` builds this catalog.
    pub enabled: bool,

    /// GitHub git-tree URL listing one sub-tree per extension.
    pub tree_url: String,

    /// YAML file with packages appended after the upstream ones.
    pub local_packages: String,

    /// Output file name.
    pub output: String,
}

/// GitHub API settings
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Documented, DocumentedFields)]
#[serde(default)]
pub struct GithubSettings {
    /// Attempts per request before giving up.
    /// Default: 3
    pub max_retries: u32,

    /// Timeout for a single request.
    /// Default: 30s
    pub timeout: String,

    /// Pause after every successful request.
    /// Default: 500ms
    pub courtesy_delay: String,

    /// Remaining quota below which the client checks the rate limit before requesting.
    /// Default: 10
    pub low_water_mark: u64,

    /// Abort the DuckDB catalog when neither GITHUB_TOKEN nor GH_TOKEN is set.
    /// Default: true
    pub require_token: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: "./json".to_string(),
            sqlite: SqliteSource::default(),
            duckdb: DuckdbSource::default(),
            github: GithubSettings::default(),
        }
    }
}

impl Default for SqliteSource {
    fn default() -> Self {
        Self {
            enabled: true,
            url: SQLPKG_URL.to_string(),
            local_packages: "./packages/sqlite/packages.yaml".to_string(),
            output: "sqlite.json".to_string(),
        }
    }
}

impl Default for DuckdbSource {
    fn default() -> Self {
        Self {
            enabled: true,
            tree_url: DUCKDB_TREE_URL.to_string(),
            local_packages: "./packages/duckdb/packages.yaml".to_string(),
            output: "duckdb.json".to_string(),
        }
    }
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: "30s".to_string(),
            courtesy_delay: "500ms".to_string(),
            low_water_mark: 10,
            require_token: true,
        }
    }
}

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("EXTCAT_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("extcat").join("config.toml"),
    })
});

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_path_buf()
}

/// Overrides the config location, e.g. from `--config`.
pub fn set_config_path<P: Into<PathBuf>>(path: P) {
    let mut guard = CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner);
    *guard = path.into();
}

impl Config {
    /// Loads the configuration from [`CONFIG_PATH`], falling back to defaults when the
    /// file does not exist.
    pub fn new() -> Result<Self> {
        Self::load(config_path())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Validates values that serde cannot check on its own.
    pub fn resolve(&mut self) -> Result<()> {
        if self.github.max_retries == 0 {
            return Err(ConfigError::InvalidRetries);
        }

        self.timeout()?;
        self.courtesy_delay()?;

        let required = [
            ("output_dir", &self.output_dir),
            ("sqlite.url", &self.sqlite.url),
            ("sqlite.output", &self.sqlite.output),
            ("duckdb.tree_url", &self.duckdb.tree_url),
            ("duckdb.output", &self.duckdb.output),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyValue(field));
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_field("github.timeout", &self.github.timeout)
    }

    pub fn courtesy_delay(&self) -> Result<Duration> {
        parse_field("github.courtesy_delay", &self.github.courtesy_delay)
    }

    pub fn get_output_dir(&self) -> Result<PathBuf> {
        Ok(resolve_path(&self.output_dir)?)
    }

    pub fn get_sqlite_output(&self) -> Result<PathBuf> {
        self.output_file(&self.sqlite.output)
    }

    pub fn get_duckdb_output(&self) -> Result<PathBuf> {
        self.output_file(&self.duckdb.output)
    }

    /// Local overrides for the SQLite catalog; `None` when not configured.
    pub fn get_sqlite_local_packages(&self) -> Result<Option<PathBuf>> {
        optional_path(&self.sqlite.local_packages)
    }

    pub fn get_duckdb_local_packages(&self) -> Result<Option<PathBuf>> {
        optional_path(&self.duckdb.local_packages)
    }

    fn output_file(&self, name: &str) -> Result<PathBuf> {
        let name = Path::new(name);
        if name.is_absolute() {
            return Ok(name.to_path_buf());
        }
        Ok(self.get_output_dir()?.join(name))
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(table) = doc.get_mut("sqlite").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<SqliteSource>(table, true)?;
        }
        if let Some(table) = doc.get_mut("duckdb").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<DuckdbSource>(table, true)?;
        }
        if let Some(table) = doc.get_mut("github").and_then(|item| item.as_table_mut()) {
            annotate_toml_table::<GithubSettings>(table, true)?;
        }

        Ok(doc)
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<Duration> {
    parse_std_duration(value).ok_or_else(|| {
        ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
        }
    })
}

fn optional_path(value: &str) -> Result<Option<PathBuf>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(resolve_path(value)?))
}

/// Writes the annotated default configuration to [`CONFIG_PATH`].
///
/// Refuses to overwrite an existing file.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists(
            config_path.display().to_string(),
        ));
    }

    let annotated_doc = Config::default().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
