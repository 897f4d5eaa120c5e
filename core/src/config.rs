//! Layered request configuration.
//!
//! # Design
//! Configuration arrives as untyped trees (`ConfigTree`) from three layers:
//! library defaults, the client instance and the individual call. The layers
//! are combined with `merge`, which is right-biased and recursive only where
//! both sides hold a map. The merged tree is then read through the typed
//! `RequestConfig`, so the request builder never does dynamic key lookups.
//!
//! Precedence, lowest to highest:
//! 1. `ConfigTree::defaults()`
//! 2. the config the `Client` was created with
//! 3. the per-call config
//! 4. values the dispatcher sets itself (`method`, `parameters`, URL auth)

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// User-Agent sent when the config does not override `options.user-agent`.
pub const DEFAULT_USER_AGENT: &str = concat!("hookhttp/", env!("CARGO_PKG_VERSION"));

/// A nested key/value configuration tree.
///
/// Backed by an insertion-ordered JSON object: nested objects are subtrees,
/// every other JSON value is a scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// The library-defaults layer, i.e. `RequestConfig::default()` as a tree.
    pub fn defaults() -> Self {
        // A derived `Serialize` on a struct with string-keyed fields always
        // yields an object, so the fallback arm is unreachable.
        match serde_json::to_value(RequestConfig::default()) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// Build a tree from a JSON value. Fails unless `value` is an object.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Return a copy of this tree with `key` replaced outright.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Shorthand for `merge(self, &[other])`.
    #[must_use]
    pub fn merged_with(&self, other: &ConfigTree) -> Self {
        merge(self, &[other])
    }

}

impl From<Map<String, Value>> for ConfigTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Merge `overrides` into `base`, left to right, returning a fresh tree.
///
/// For each key in an override: when both the merged value and the override
/// value are maps the two are merged recursively, otherwise the override
/// value replaces whatever was there (a map can replace a scalar and a
/// scalar can replace a map). Neither input is modified.
pub fn merge(base: &ConfigTree, overrides: &[&ConfigTree]) -> ConfigTree {
    let mut merged = base.0.clone();
    for layer in overrides {
        merge_into(&mut merged, &layer.0);
    }
    ConfigTree(merged)
}

fn merge_into(target: &mut Map<String, Value>, layer: &Map<String, Value>) {
    for (key, value) in layer {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (target.get_mut(key), value) {
            merge_into(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Typed view over a merged `ConfigTree`.
///
/// Every field has a default, so any subset of keys may be present. Keys that
/// are not listed here are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Request method name, validated when the request is built.
    pub method: String,
    pub auth: AuthConfig,
    /// PUT payload: a path to an existing file, or the literal body.
    #[serde(deserialize_with = "scalar_string")]
    pub data: String,
    /// Accepts a map or a URL-encoded query string such as `"a=1&b=2"`.
    #[serde(deserialize_with = "query_or_map")]
    pub parameters: IndexMap<String, String>,
    #[serde(deserialize_with = "scalar_map")]
    pub cookie: IndexMap<String, String>,
    #[serde(deserialize_with = "scalar_map")]
    pub headers: IndexMap<String, String>,
    pub options: OptionsConfig,
}

impl Default for RequestConfig {
    fn default() -> Self {
        let headers = [
            ("Connection", "keep-alive"),
            ("Keep-Alive", "300"),
            ("Accept-Charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.7"),
            ("Accept-Language", "en-us,en;q=0.5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            method: "GET".to_string(),
            auth: AuthConfig::default(),
            data: String::new(),
            parameters: IndexMap::new(),
            cookie: IndexMap::new(),
            headers,
            options: OptionsConfig::default(),
        }
    }
}

impl RequestConfig {
    /// Read a merged tree. Fails with `Error::Config` on wrongly shaped values.
    pub fn from_tree(tree: &ConfigTree) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(tree.0.clone()))?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(deserialize_with = "scalar_string")]
    pub user: String,
    #[serde(deserialize_with = "scalar_string")]
    pub pass: String,
}

/// Transport settings. Timeouts are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,
    pub timeout: u64,
    pub connect_timeout: u64,
    pub follow_location: bool,
    pub max_redirects: u32,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: 10,
            connect_timeout: 2,
            follow_location: true,
            max_redirects: 3,
        }
    }
}

/// Render a JSON scalar the way it would appear in a header or query string.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(value).ok_or_else(|| D::Error::custom("expected a scalar value"))
}

fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
    scalar_pairs(raw)
}

fn query_or_map<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(query) => decode_query(&query).map_err(D::Error::custom),
        Value::Object(map) => scalar_pairs(map),
        other => Err(D::Error::custom(format!(
            "expected a map or a query string, found {other}"
        ))),
    }
}

fn scalar_pairs<E: serde::de::Error>(
    raw: impl IntoIterator<Item = (String, Value)>,
) -> std::result::Result<IndexMap<String, String>, E> {
    raw.into_iter()
        .map(|(key, value)| match scalar_to_string(value) {
            Some(text) => Ok((key, text)),
            None => Err(E::custom(format!("expected a scalar value for '{key}'"))),
        })
        .collect()
}

/// Decode a URL-encoded query string, with or without a leading `?`, into
/// ordered pairs.
pub(crate) fn decode_query(
    query: &str,
) -> std::result::Result<IndexMap<String, String>, serde_urlencoded::de::Error> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    Ok(pairs.into_iter().collect())
}
