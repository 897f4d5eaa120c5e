//! Transport-agnostic request descriptors.
//!
//! # Design
//! These types describe an HTTP request as plain data. `build_request` turns a
//! URL plus a merged `ConfigTree` into a `RequestDescriptor` without touching
//! the network; the `Transport` is then responsible for the actual I/O,
//! honoring every field (verb override, body source, timeouts, TLS flags).
//!
//! All fields use owned types so a descriptor can be handed to listeners and
//! transports without lifetime concerns.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;

use crate::config::{decode_query, ConfigTree, RequestConfig};
use crate::error::{Error, Result};
use crate::url::UrlParts;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Method::Get, Method::Post, Method::Put, Method::Delete, Method::Head]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidRequest(format!("unsupported method '{s}'")))
    }
}

/// Caller-supplied request parameters.
///
/// A query string (`"a=1&b=2"`) is decoded into pairs; pairs are used as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Params {
    #[default]
    None,
    Query(String),
    Pairs(IndexMap<String, String>),
}

impl Params {
    /// Normalize into an ordered parameter map.
    pub fn into_map(self) -> Result<IndexMap<String, String>> {
        match self {
            Params::None => Ok(IndexMap::new()),
            Params::Pairs(map) => Ok(map),
            Params::Query(query) => decode_query(&query)
                .map_err(|e| Error::InvalidRequest(format!("invalid query string: {e}"))),
        }
    }
}

impl From<&str> for Params {
    fn from(query: &str) -> Self {
        Params::Query(query.to_string())
    }
}

impl From<String> for Params {
    fn from(query: String) -> Self {
        Params::Query(query)
    }
}

impl From<IndexMap<String, String>> for Params {
    fn from(map: IndexMap<String, String>) -> Self {
        Params::Pairs(map)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Params {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Params::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        Params::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Request body source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    /// Stream the file at `path`, declaring `size` bytes up front.
    File { path: PathBuf, size: u64 },
}

/// HTTP auth scheme the transport should negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Let the transport pick whatever the server offers.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
    pub scheme: AuthScheme,
}

impl Credentials {
    /// `user:pass`, the form basic auth and most transports expect.
    pub fn user_pass(&self) -> String {
        format!("{}:{}", self.user, self.pass)
    }
}

/// Settings the transport must honor; the core never enforces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub follow_location: bool,
    pub max_redirects: u32,
    pub verify_peer: bool,
    pub verify_host: bool,
}

/// A fully resolved, transport-ready HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Target URL, credentials stripped, query parameters appended for
    /// every method except POST.
    pub url: String,
    pub parameters: IndexMap<String, String>,
    pub body: Body,
    pub headers: IndexMap<String, String>,
    pub cookies: IndexMap<String, String>,
    pub auth: Option<Credentials>,
    pub options: TransportOptions,
    /// Verb the transport must send verbatim instead of deriving one from the body.
    pub custom_request: Option<Method>,
    /// Do not read a response body (HEAD).
    pub no_body: bool,
}

impl RequestDescriptor {
    /// Serialized `Cookie` header value, `None` when there are no cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
        Some(pairs.join("; "))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Build a descriptor for `url` from a merged configuration tree.
pub fn build_request(url: &str, config: &ConfigTree) -> Result<RequestDescriptor> {
    build_with(url, RequestConfig::from_tree(config)?)
}

/// Build a descriptor for `url` from an already resolved config.
pub fn build_with(url: &str, config: RequestConfig) -> Result<RequestDescriptor> {
    if url.trim().is_empty() {
        return Err(Error::InvalidRequest("no URL has been set for request".to_string()));
    }
    let method: Method = config.method.parse()?;

    let parts = UrlParts::parse(url)?;
    let (user, pass) = match parts.credentials() {
        Some((user, pass)) => (user.to_string(), pass.to_string()),
        None => (config.auth.user, config.auth.pass),
    };
    let auth = (!user.is_empty()).then_some(Credentials {
        user,
        pass,
        scheme: AuthScheme::Any,
    });
    let target = parts.build(true);

    let query = serde_urlencoded::to_string(&config.parameters)?;
    let mut headers = config.headers;
    let mut body = Body::Empty;
    let mut custom_request = None;

    let url = match method {
        Method::Post => {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.insert(
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                );
            }
            body = Body::Bytes(query.into_bytes());
            target
        }
        Method::Put => {
            body = put_body(config.data);
            if matches!(body, Body::Bytes(_)) {
                custom_request = Some(Method::Put);
            }
            append_query(&target, &query)
        }
        Method::Delete => {
            custom_request = Some(Method::Delete);
            append_query(&target, &query)
        }
        Method::Get | Method::Head => append_query(&target, &query),
    };

    let options = config.options;
    Ok(RequestDescriptor {
        method,
        url,
        parameters: config.parameters,
        body,
        headers,
        cookies: config.cookie,
        auth,
        options: TransportOptions {
            user_agent: options.user_agent,
            timeout: Duration::from_secs(options.timeout),
            connect_timeout: Duration::from_secs(options.connect_timeout),
            follow_location: options.follow_location,
            max_redirects: options.max_redirects,
            verify_peer: true,
            verify_host: true,
        },
        custom_request,
        no_body: method == Method::Head,
    })
}

/// A `data` value naming an existing file becomes a file body; anything else
/// is sent literally.
fn put_body(data: String) -> Body {
    if !data.is_empty() {
        if let Ok(meta) = std::fs::metadata(&data) {
            if meta.is_file() {
                return Body::File {
                    path: PathBuf::from(data),
                    size: meta.len(),
                };
            }
        }
    }
    Body::Bytes(data.into_bytes())
}

/// Append `query` to `url`, before any fragment, joining with `?` or `&`.
fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let mut out = base.to_string();
    if !base.ends_with(['?', '&']) {
        out.push(if base.contains(['?', '&']) { '&' } else { '?' });
    }
    out.push_str(query);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn config(value: serde_json::Value) -> ConfigTree {
        ConfigTree::defaults().merged_with(&ConfigTree::from_value(value).unwrap())
    }

    #[test]
    fn get_appends_parameters_in_insertion_order() {
        let req = build_request(
            "http://h/path",
            &config(json!({ "parameters": { "a": "1", "b": "2" } })),
        )
        .unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.url, "http://h/path?a=1&b=2");
        assert_eq!(req.body, Body::Empty);
        assert!(req.custom_request.is_none());
    }

    #[test]
    fn query_string_parameters_are_decoded() {
        let req = build_request("http://h/path", &config(json!({ "parameters": "a=1&b=2" }))).unwrap();
        assert_eq!(req.url, "http://h/path?a=1&b=2");
        assert_eq!(req.parameters["b"], "2");

        let post = build_request(
            "http://h/form",
            &config(json!({ "method": "POST", "parameters": "?name=a+b" })),
        )
        .unwrap();
        assert_eq!(post.url, "http://h/form");
        assert_eq!(post.body, Body::Bytes(b"name=a+b".to_vec()));
    }

    #[test]
    fn existing_query_is_joined_with_ampersand() {
        let req = build_request(
            "http://h/path?x=0#top",
            &config(json!({ "parameters": { "a": "1 2" } })),
        )
        .unwrap();
        assert_eq!(req.url, "http://h/path?x=0&a=1+2#top");
    }

    #[test]
    fn method_defaults_to_get() {
        let tree = ConfigTree::from_value(json!({})).unwrap();
        let req = build_request("http://h/", &tree).unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.url, "http://h/");
    }

    #[test]
    fn empty_url_is_invalid() {
        let err = build_request("  ", &ConfigTree::defaults()).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn unknown_method_is_invalid() {
        let err = build_request("http://h/", &config(json!({ "method": "PATCH" }))).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn url_credentials_become_auth_and_are_stripped() {
        let req = build_request("http://bob:secret@h/p", &ConfigTree::defaults()).unwrap();
        assert_eq!(req.url, "http://h/p");
        let auth = req.auth.unwrap();
        assert_eq!(auth.user_pass(), "bob:secret");
        assert_eq!(auth.scheme, AuthScheme::Any);
    }

    #[test]
    fn config_auth_used_when_url_has_none() {
        let req = build_request(
            "http://h/p",
            &config(json!({ "auth": { "user": "carol", "pass": "pw" } })),
        )
        .unwrap();
        assert_eq!(req.auth.map(|a| a.user_pass()).as_deref(), Some("carol:pw"));

        let anonymous = build_request("http://h/p", &ConfigTree::defaults()).unwrap();
        assert!(anonymous.auth.is_none());
    }

    #[test]
    fn default_headers_and_options_are_attached() {
        let req = build_request(
            "https://h/",
            &config(json!({ "headers": { "X-Custom": "yes" }, "options": { "timeout": 30 } })),
        )
        .unwrap();
        assert_eq!(req.header("connection"), Some("keep-alive"));
        assert_eq!(req.header("Keep-Alive"), Some("300"));
        assert_eq!(req.header("X-Custom"), Some("yes"));
        assert_eq!(req.options.timeout, Duration::from_secs(30));
        assert_eq!(req.options.connect_timeout, Duration::from_secs(2));
        assert!(req.options.verify_peer && req.options.verify_host);
        assert!(req.options.user_agent.starts_with("hookhttp/"));
    }

    #[test]
    fn cookies_serialize_in_order() {
        let req = build_request(
            "http://h/",
            &config(json!({ "cookie": { "session": "abc", "theme": "dark" } })),
        )
        .unwrap();
        assert_eq!(req.cookie_header().as_deref(), Some("session=abc; theme=dark"));

        let none = build_request("http://h/", &ConfigTree::defaults()).unwrap();
        assert_eq!(none.cookie_header(), None);
    }

    #[test]
    fn post_sends_form_body_and_keeps_url() {
        let req = build_request(
            "http://h/form",
            &config(json!({ "method": "POST", "parameters": { "name": "a b", "n": 1 } })),
        )
        .unwrap();
        assert_eq!(req.url, "http://h/form");
        assert_eq!(req.body, Body::Bytes(b"name=a+b&n=1".to_vec()));
        assert_eq!(req.header("content-type"), Some("application/x-www-form-urlencoded"));
    }

    #[test]
    fn post_keeps_caller_content_type() {
        let req = build_request(
            "http://h/form",
            &config(json!({ "method": "POST", "headers": { "content-type": "text/plain" } })),
        )
        .unwrap();
        assert_eq!(req.header("Content-Type"), Some("text/plain"));
        assert_eq!(req.headers.len(), 5);
    }

    #[test]
    fn put_with_existing_file_streams_it() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"twelve bytes").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let req = build_request(
            "http://h/upload",
            &config(json!({ "method": "PUT", "data": path })),
        )
        .unwrap();
        assert_eq!(
            req.body,
            Body::File {
                path: file.path().to_path_buf(),
                size: 12
            }
        );
        assert!(req.custom_request.is_none());
    }

    #[test]
    fn put_with_literal_data_overrides_verb() {
        let req = build_request(
            "http://h/upload",
            &config(json!({ "method": "PUT", "data": "k=v", "parameters": { "q": "1" } })),
        )
        .unwrap();
        assert_eq!(req.body, Body::Bytes(b"k=v".to_vec()));
        assert_eq!(req.custom_request, Some(Method::Put));
        assert_eq!(req.url, "http://h/upload?q=1");
    }

    #[test]
    fn delete_and_head_carry_transport_hints() {
        let delete = build_request("http://h/x", &config(json!({ "method": "DELETE" }))).unwrap();
        assert_eq!(delete.custom_request, Some(Method::Delete));
        assert!(!delete.no_body);

        let head = build_request("http://h/x", &config(json!({ "method": "head" }))).unwrap();
        assert_eq!(head.method, Method::Head);
        assert!(head.no_body);
    }

    #[test]
    fn query_string_params_are_decoded() {
        let map = Params::from("?a=1&b=hello+world&c=%26").into_map().unwrap();
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "hello world");
        assert_eq!(map["c"], "&");
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn pair_params_are_used_as_is() {
        let map = Params::from([("z", "1"), ("a", "2")]).into_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["z", "a"]);
        assert!(Params::None.into_map().unwrap().is_empty());
    }

    #[test]
    fn append_query_handles_trailing_delimiters() {
        assert_eq!(append_query("http://h/p?", "a=1"), "http://h/p?a=1");
        assert_eq!(append_query("http://h/p", ""), "http://h/p");
    }
}
