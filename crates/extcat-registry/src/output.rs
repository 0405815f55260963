use std::path::{Path, PathBuf};

use extcat_utils::fs::write_atomic;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Outcome of one catalog build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Entries obtained from the remote source.
    pub remote: usize,
    /// Entries appended from the local overrides file.
    pub local: usize,
    pub output: PathBuf,
}

impl CatalogSummary {
    pub fn total(&self) -> usize {
        self.remote + self.local
    }
}

/// Writes `items` as a pretty-printed JSON array, creating parent directories as needed.
///
/// Non-ASCII text is written as UTF-8, not escaped.
pub fn save_json<T, P>(items: &[T], path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = serde_json::to_vec_pretty(items)?;
    write_atomic(path, &content)?;

    info!("Saved {} entries to {}", items.len(), path.display());
    Ok(())
}
