//! URL decomposition and recomposition.
//!
//! # Design
//! `UrlParts` is a flat, fully defaulted view of a URL: every component is a
//! plain owned value, empty when absent, so rebuilding never has to reason
//! about `Option`s. Parsing is delegated to the `url` crate; only the
//! serialization rules (credential stripping, default-port elision) live here.

use std::fmt;
use std::str::FromStr;

use url::{ParseError, Url};

use crate::error::{Error, Result};

/// The components of a URL, each defaulted when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl Default for UrlParts {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: String::new(),
            port: 80,
            user: String::new(),
            pass: String::new(),
            path: String::new(),
            query: String::new(),
            fragment: String::new(),
        }
    }
}

impl UrlParts {
    /// Decompose `input`. A string with no scheme, including the bare
    /// `host:port/path` form, is read as `http://...`. A URL without a host
    /// is rejected.
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = match Url::parse(input) {
            Ok(url) if has_host(&url) => url,
            Ok(_) if !input.contains("://") && looks_like_host_port(input) => with_http(input)?,
            Ok(_) => {
                return Err(Error::MalformedUrl {
                    url: input.to_string(),
                    reason: "URL has no host".to_string(),
                })
            }
            Err(ParseError::RelativeUrlWithoutBase) => with_http(input)?,
            Err(e) => return Err(malformed(input, &e)),
        };

        Ok(Self {
            port: parsed
                .port_or_known_default()
                .unwrap_or_else(|| default_port(parsed.scheme())),
            host: parsed.host_str().unwrap_or_default().to_string(),
            user: parsed.username().to_string(),
            pass: parsed.password().unwrap_or_default().to_string(),
            path: parsed.path().to_string(),
            query: parsed.query().unwrap_or_default().to_string(),
            fragment: parsed.fragment().unwrap_or_default().to_string(),
            scheme: parsed.scheme().to_string(),
        })
    }

    /// Serialize as `scheme://[user[:pass]@]host[:port]path[?query][#fragment]`.
    ///
    /// The port is written only when it differs from the scheme's default.
    /// With `strip_auth` set, user and password are never written.
    pub fn build(&self, strip_auth: bool) -> String {
        let mut out = format!("{}://", self.scheme);
        if !strip_auth && !self.user.is_empty() {
            out.push_str(&self.user);
            if !self.pass.is_empty() {
                out.push(':');
                out.push_str(&self.pass);
            }
            out.push('@');
        }
        out.push_str(&self.host);
        if self.port != default_port(&self.scheme) {
            out.push(':');
            out.push_str(&self.port.to_string());
        }
        out.push_str(&self.path);
        if !self.query.is_empty() {
            out.push('?');
            out.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            out.push('#');
            out.push_str(&self.fragment);
        }
        out
    }

    /// Embedded `(user, pass)` when a user name is present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        (!self.user.is_empty()).then_some((self.user.as_str(), self.pass.as_str()))
    }
}

impl FromStr for UrlParts {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build(false))
    }
}

/// Port elided on output. Matches the `url` crate's known defaults so a
/// parsed URL with no explicit port never gains one when rebuilt.
pub fn default_port(scheme: &str) -> u16 {
    match scheme.to_ascii_lowercase().as_str() {
        "https" | "wss" => 443,
        "ftp" => 21,
        _ => 80,
    }
}

fn has_host(url: &Url) -> bool {
    url.host_str().is_some_and(|host| !host.is_empty())
}

/// `name:1234`, optionally followed by a path, query or fragment.
fn looks_like_host_port(input: &str) -> bool {
    input.split_once(':').is_some_and(|(_, rest)| {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        digits > 0 && rest[digits..].chars().next().is_none_or(|c| matches!(c, '/' | '?' | '#'))
    })
}

fn with_http(input: &str) -> Result<Url> {
    let url = Url::parse(&format!("http://{input}")).map_err(|e| malformed(input, &e))?;
    if !has_host(&url) {
        return Err(Error::MalformedUrl {
            url: input.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    Ok(url)
}

fn malformed(url: &str, err: &ParseError) -> Error {
    Error::MalformedUrl {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
