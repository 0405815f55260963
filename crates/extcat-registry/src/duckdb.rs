//! The DuckDB catalog, built by walking the community-extensions git tree.
//!
//! The root tree holds one sub-tree per extension; each sub-tree carries a
//! `description.yml` blob. Every blob costs one API request, so the walk goes through
//! [`RateLimitedClient`] and tolerates individual failures.

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use extcat_config::config::Config;
use extcat_dl::{
    backoff::Backoff,
    client::{ClientConfig, RateLimitedClient},
    github::{token_from_env, GitBlob, GitTree},
    transport::Transport,
    wait::Waiter,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    error::{RegistryError, Result},
    local::parse_local_packages,
    output::{save_json, CatalogSummary},
    package::{DescriptionFile, ExtensionRecord, DESCRIPTION_FILE},
};

/// Builds the API client settings from the `[github]` section and the environment.
pub fn client_config(config: &Config) -> Result<ClientConfig> {
    Ok(ClientConfig {
        token: token_from_env(),
        max_retries: config.github.max_retries,
        timeout: config.timeout()?,
        courtesy_delay: config.courtesy_delay()?,
        low_water_mark: config.github.low_water_mark,
        backoff: Backoff::default(),
        ..ClientConfig::default()
    })
}

/// Decodes the base64 `content` of a blob and parses it as a description.
///
/// GitHub wraps the encoded content in newlines; all whitespace is ignored.
pub fn decode_description(content: &str) -> Result<DescriptionFile> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(serde_yaml::from_slice(&bytes)?)
}

#[derive(Debug, Clone)]
pub struct DuckdbCatalog {
    pub tree_url: String,
    pub local_packages: Option<PathBuf>,
    pub output: PathBuf,
    /// Abort before any tree request when no token is available.
    pub require_token: bool,
}

impl DuckdbCatalog {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            tree_url: config.duckdb.tree_url.clone(),
            local_packages: config.get_duckdb_local_packages()?,
            output: config.get_duckdb_output()?,
            require_token: config.github.require_token,
        })
    }

    pub fn build(&self, client_config: ClientConfig) -> Result<CatalogSummary> {
        let mut client = RateLimitedClient::new(client_config);
        self.build_with(&mut client)
    }

    /// Checks the quota, walks the tree, appends local overrides and writes the catalog.
    pub fn build_with<T, W>(&self, client: &mut RateLimitedClient<T, W>) -> Result<CatalogSummary>
    where
        T: Transport,
        W: Waiter,
    {
        client.check_rate_limit();

        if !client.has_token() && self.require_token {
            error!("Refusing to walk the DuckDB tree without a GitHub token");
            return Err(RegistryError::MissingToken);
        }

        let records = self.collect(client)?;
        let remote = records.len();

        let local = match &self.local_packages {
            Some(path) => parse_local_packages(remote, path)?,
            None => Vec::new(),
        };
        let local_count = local.len();

        let mut items = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        items.extend(local);

        save_json(&items, &self.output)?;

        Ok(CatalogSummary {
            remote,
            local: local_count,
            output: self.output.clone(),
        })
    }

    /// Walks the root tree and returns one record per decodable description.
    ///
    /// Only a missing root tree is an error; sub-trees and blobs that cannot be fetched
    /// or decoded are skipped.
    pub fn collect<T, W>(&self, client: &mut RateLimitedClient<T, W>) -> Result<Vec<ExtensionRecord>>
    where
        T: Transport,
        W: Waiter,
    {
        let root: GitTree = client
            .get_json(&self.tree_url)
            .ok_or_else(|| RegistryError::FailedToFetchRemote(self.tree_url.clone()))?;

        if root.truncated {
            warn!("Tree {} is truncated, some extensions will be missing", self.tree_url);
        }
        info!("Found {} entries in the DuckDB extension tree", root.tree.len());

        let mut records = Vec::new();
        for branch in &root.tree {
            if !branch.is_tree() {
                debug!("Skipping {} ({})", branch.path, branch.kind);
                continue;
            }

            let Some(stem) = client.get_json::<GitTree>(&branch.url) else {
                warn!("Skipping {}: tree unavailable", branch.path);
                continue;
            };

            for leaf in stem.tree.iter().filter(|leaf| leaf.path == DESCRIPTION_FILE) {
                let Some(blob) = client.get_json::<GitBlob>(&leaf.url) else {
                    warn!("Skipping {}: {} unavailable", branch.path, DESCRIPTION_FILE);
                    continue;
                };

                match decode_description(&blob.content) {
                    Ok(description) => {
                        let record = ExtensionRecord::from_description(records.len(), description);
                        debug!("Parsed {} {}", record.name, record.version);
                        records.push(record);
                    }
                    Err(err) => warn!("Skipping {}: {err}", branch.path),
                }
            }
        }

        info!("Collected {} DuckDB extensions", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use base64::Engine as _;
    use extcat_dl::{
        github::RATE_LIMIT_URL,
        testing::{RecordingWaiter, Reply, ScriptedTransport},
    };
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    const ROOT: &str = "https://api.github.com/repos/duckdb/community-extensions/git/trees/root";

    fn tree_url(name: &str) -> String {
        format!("https://api.github.com/repos/duckdb/community-extensions/git/trees/{name}")
    }

    fn blob_url(name: &str) -> String {
        format!("https://api.github.com/repos/duckdb/community-extensions/git/blobs/{name}")
    }

    fn ok(body: impl Into<String>) -> Reply {
        Reply::json(200, body).with_quota(4000, 0)
    }

    /// Encodes like the blobs API: base64 wrapped at 60 columns.
    fn encode_blob(yaml: &str) -> String {
        let encoded = STANDARD.encode(yaml);
        let wrapped: Vec<String> = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        json!({"sha": "x", "encoding": "base64", "content": wrapped.join("\n")}).to_string()
    }

    fn root_tree(entries: &[(&str, &str)]) -> String {
        let tree: Vec<Value> = entries
            .iter()
            .map(|(path, kind)| {
                let url = if *kind == "tree" {
                    tree_url(path)
                } else {
                    blob_url(path)
                };
                json!({"path": path, "type": kind, "sha": path, "url": url})
            })
            .collect();
        json!({"sha": "root", "tree": tree, "truncated": false}).to_string()
    }

    fn stem_tree(name: &str) -> String {
        json!({
            "sha": name,
            "tree": [
                {"path": "description.yml", "type": "blob", "url": blob_url(name)},
                {"path": "docs", "type": "tree", "url": tree_url(&format!("{name}-docs"))}
            ]
        })
        .to_string()
    }

    fn description(name: &str, version: &str) -> String {
        format!(
            "extension:\n  name: {name}\n  version: {version}\n  license: MIT\n  maintainers:\n    - dev\nrepo:\n  github: dev/{name}\n"
        )
    }

    fn catalog(dir: &std::path::Path, require_token: bool) -> DuckdbCatalog {
        DuckdbCatalog {
            tree_url: ROOT.to_string(),
            local_packages: None,
            output: dir.join("duckdb.json"),
            require_token,
        }
    }

    fn client(
        transport: ScriptedTransport,
        token: Option<&str>,
    ) -> RateLimitedClient<ScriptedTransport, RecordingWaiter> {
        let config = ClientConfig {
            token: token.map(String::from),
            ..ClientConfig::default()
        };
        RateLimitedClient::with_parts(config, transport, RecordingWaiter::new())
    }

    fn rate_limit() -> Reply {
        ok(json!({"resources": {"core": {"limit": 5000, "remaining": 4000, "reset": 0}}}).to_string())
    }

    #[test]
    fn test_decode_description_ignores_wrapping() {
        let blob: GitBlob = serde_json::from_str(&encode_blob(&description("h3", "1.0.0"))).unwrap();
        let desc = decode_description(&blob.content).unwrap();
        assert_eq!(desc.extension.name, "h3");
    }

    #[test]
    fn test_decode_description_rejects_garbage() {
        assert!(matches!(
            decode_description("!!!not base64"),
            Err(RegistryError::Base64Error(_))
        ));

        let not_yaml = STANDARD.encode("extension: [unclosed");
        assert!(matches!(
            decode_description(&not_yaml),
            Err(RegistryError::YamlError(_))
        ));
    }

    #[test]
    fn test_build_walks_tree_and_appends_local() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("packages.yaml");
        fs::write(&local, "- name: private_ext\n").unwrap();

        let transport = ScriptedTransport::new()
            .route(RATE_LIMIT_URL, [rate_limit()])
            .route(
                ROOT,
                [ok(root_tree(&[
                    ("README.md", "blob"),
                    ("h3", "tree"),
                    ("broken", "tree"),
                    ("gone", "tree"),
                    ("quack", "tree"),
                ]))],
            )
            .route(tree_url("h3"), [ok(stem_tree("h3"))])
            .route(blob_url("h3"), [ok(encode_blob(&description("h3", "1.0.0")))])
            .route(tree_url("broken"), [ok(stem_tree("broken"))])
            .route(
                blob_url("broken"),
                [ok(json!({"content": STANDARD.encode("name: no extension key")}).to_string())],
            )
            .route(tree_url("quack"), [ok(stem_tree("quack"))])
            .route(blob_url("quack"), [ok(encode_blob(&description("quack", "0.1")))]);
        let mut client = client(transport, Some("token"));

        let mut catalog = catalog(dir.path(), true);
        catalog.local_packages = Some(local);

        let summary = catalog.build_with(&mut client).unwrap();

        assert_eq!(summary.remote, 2);
        assert_eq!(summary.local, 1);

        let written: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(&catalog.output).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0]["id"], json!(0));
        assert_eq!(written[0]["name"], json!("h3"));
        assert_eq!(written[0]["repository"], json!("https://github.com/dev/h3"));
        assert_eq!(written[1]["id"], json!(1));
        assert_eq!(written[1]["name"], json!("quack"));
        assert_eq!(written[1]["version"], json!("0.1"));
        assert_eq!(written[2]["name"], json!("private_ext"));
        assert_eq!(written[2]["id"], json!(2));

        let transport = client.transport();
        assert_eq!(transport.requests()[0], RATE_LIMIT_URL);
        assert_eq!(transport.request_count(&blob_url("README.md")), 0);
        assert_eq!(transport.request_count(&tree_url("h3-docs")), 0);
        // not-found sub-tree is not retried
        assert_eq!(transport.request_count(&tree_url("gone")), 1);
    }

    #[test]
    fn test_written_catalog_keeps_field_order() {
        let dir = tempdir().unwrap();
        let local = dir.path().join("packages.yaml");
        fs::write(&local, "- version: '2.0'\n  name: private_ext\n").unwrap();

        let transport = ScriptedTransport::new()
            .route(RATE_LIMIT_URL, [rate_limit()])
            .route(ROOT, [ok(root_tree(&[("h3", "tree")]))])
            .route(tree_url("h3"), [ok(stem_tree("h3"))])
            .route(blob_url("h3"), [ok(encode_blob(&description("h3", "1.0.0")))]);
        let mut client = client(transport, Some("token"));

        let mut catalog = catalog(dir.path(), true);
        catalog.local_packages = Some(local);
        catalog.build_with(&mut client).unwrap();

        let written: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(&catalog.output).unwrap()).unwrap();
        let keys = |entry: &Value| -> Vec<String> {
            entry.as_object().unwrap().keys().cloned().collect()
        };

        assert_eq!(
            keys(&written[0]),
            [
                "id",
                "fullname",
                "name",
                "version",
                "homepage",
                "repository",
                "authors",
                "license",
                "description",
                "keywords",
                "symbols",
                "assets"
            ]
        );
        assert_eq!(keys(&written[1]), ["version", "name", "id"]);
    }

    #[test]
    fn test_missing_token_aborts_before_tree() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .route(RATE_LIMIT_URL, [rate_limit()])
            .route(ROOT, [ok(root_tree(&[]))]);
        let mut client = client(transport, None);

        let result = catalog(dir.path(), true).build_with(&mut client);

        assert!(matches!(result, Err(RegistryError::MissingToken)));
        assert_eq!(client.transport().request_count(ROOT), 0);
        assert!(!dir.path().join("duckdb.json").exists());
    }

    #[test]
    fn test_missing_token_allowed_when_not_required() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .route(RATE_LIMIT_URL, [rate_limit()])
            .route(ROOT, [ok(root_tree(&[]))]);
        let mut client = client(transport, None);

        let summary = catalog(dir.path(), false).build_with(&mut client).unwrap();

        assert_eq!(summary.total(), 0);
        assert_eq!(fs::read_to_string(&summary.output).unwrap(), "[]");
    }

    #[test]
    fn test_unavailable_root_tree_fails() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new().route(RATE_LIMIT_URL, [rate_limit()]);
        let mut client = client(transport, Some("token"));

        let result = catalog(dir.path(), true).build_with(&mut client);

        assert!(matches!(result, Err(RegistryError::FailedToFetchRemote(_))));
        assert!(!dir.path().join("duckdb.json").exists());
    }

    #[test]
    fn test_client_config_from_settings() {
        let mut config = Config::default();
        config.github.max_retries = 5;
        config.github.courtesy_delay = "1s".to_string();

        let client_config = client_config(&config).unwrap();
        assert_eq!(client_config.max_retries, 5);
        assert_eq!(client_config.courtesy_delay, std::time::Duration::from_secs(1));
        assert_eq!(client_config.low_water_mark, 10);
    }
}
