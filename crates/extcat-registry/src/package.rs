//! Catalog records and the `description.yml` format they are built from.
//!
//! Extension descriptions are hand-written YAML, so the deserializers here are lenient:
//! versions may be numbers or strings, optional sections may be missing, and empty
//! strings count as absent.

use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::{Map, Value};

/// File name of an extension description inside its sub-tree.
pub const DESCRIPTION_FILE: &str = "description.yml";

fn empty_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()))
}

/// Accepts strings, numbers and booleans and renders them as text; null becomes "".
fn stringify<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringifyVisitor;

    impl<'de> Visitor<'de> for StringifyVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string, number, boolean or null")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            // keep `1.0` from collapsing to `1`
            if v.is_finite() && v.fract() == 0.0 {
                Ok(format!("{v:.1}"))
            } else {
                Ok(v.to_string())
            }
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringifyVisitor)
}

/// Parsed `description.yml` of a DuckDB community extension.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionFile {
    pub extension: ExtensionSection,
    #[serde(default)]
    pub repo: Option<RepoSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionSection {
    #[serde(default, deserialize_with = "stringify")]
    pub name: String,
    #[serde(default, deserialize_with = "stringify")]
    pub version: String,
    #[serde(default, deserialize_with = "stringify")]
    pub description: String,
    /// Usually a list of GitHub handles; kept as-is.
    #[serde(default)]
    pub maintainers: Option<Value>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub license: Option<String>,
    /// British spelling used by some descriptions.
    #[serde(default, deserialize_with = "empty_is_none")]
    pub licence: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoSection {
    #[serde(default, deserialize_with = "stringify")]
    pub github: String,
}

/// One entry of the generated DuckDB catalog.
///
/// Field order is the order written to `duckdb.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionRecord {
    pub id: usize,
    /// `owner/repo` on GitHub.
    pub fullname: String,
    pub name: String,
    pub version: String,
    pub homepage: String,
    pub repository: String,
    pub authors: Value,
    pub license: String,
    pub description: String,
    pub keywords: String,
    pub symbols: Vec<String>,
    pub assets: Map<String, Value>,
}

impl ExtensionRecord {
    pub fn from_description(id: usize, description: DescriptionFile) -> Self {
        let DescriptionFile {
            extension,
            repo,
        } = description;
        let fullname = repo.map(|repo| repo.github).unwrap_or_default();

        Self {
            id,
            repository: format!("https://github.com/{fullname}"),
            fullname,
            name: extension.name,
            version: extension.version,
            homepage: String::new(),
            authors: extension
                .maintainers
                .filter(|value| !value.is_null())
                .unwrap_or_else(|| Value::String(String::new())),
            license: extension
                .license
                .or(extension.licence)
                .unwrap_or_default(),
            description: extension.description,
            keywords: String::new(),
            symbols: Vec::new(),
            assets: Map::new(),
        }
    }
}
