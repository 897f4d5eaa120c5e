//! Raw HTTP response decoding.
//!
//! # Design
//! The transport hands back the response exactly as it came off the wire
//! (minus transfer/content encoding). Decoding splits it once on the first
//! blank line, skips a single `100 Continue` interim block if present, reads
//! the status line and header lines from the head, and keeps the rest as the
//! body without looking at it.

use std::borrow::Cow;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result, TransportError};
use crate::http::RequestDescriptor;
use crate::transport::TransportInfo;

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<protocol>HTTPS?)/(?P<version>\d(?:\.\d)?)\s+(?P<code>\d{3})(?:\s+(?P<status>.*))?$")
        .expect("status line pattern is valid")
});

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A decoded response, or the error-flavored stand-in for a transport failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// HTTP status code; 0 when the transport failed.
    pub code: u16,
    /// Reason phrase, or the transport's error message on failure.
    pub status: String,
    /// Headers in order of first appearance; a repeated name keeps the last value.
    pub headers: IndexMap<String, String>,
    pub body: Vec<u8>,
    /// The complete byte stream as received from the transport.
    pub raw: Vec<u8>,
    pub request_url: String,
    pub request_parameters: IndexMap<String, String>,
    pub info: TransportInfo,
    pub error: Option<TransportError>,
}

impl Response {
    /// Decode a raw response byte stream.
    ///
    /// Fails with `Error::MalformedResponse` when there is no `CRLFCRLF`
    /// separator or no parseable status line.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let (mut head, mut body) = split_head(raw)?;
        if is_interim(head) {
            (head, body) = split_head(body)?;
        }

        let head = String::from_utf8_lossy(head);
        let mut status_line = None;
        let mut headers = IndexMap::new();
        for line in head.lines() {
            if status_line.is_none() {
                if let Some(caps) = STATUS_LINE.captures(line) {
                    let code = caps["code"]
                        .parse::<u16>()
                        .map_err(|e| Error::MalformedResponse(format!("bad status code: {e}")))?;
                    let status = caps.name("status").map_or("", |m| m.as_str()).trim();
                    status_line = Some((code, status.to_string()));
                    continue;
                }
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.to_string(), value.trim().to_string());
                }
                None if line.is_empty() => {}
                None => trace!(header_line = line, "skipping header line without a colon"),
            }
        }

        let (code, status) = status_line
            .ok_or_else(|| Error::MalformedResponse("no status line in response head".to_string()))?;

        Ok(Self {
            code,
            status,
            headers,
            body: body.to_vec(),
            raw: raw.to_vec(),
            ..Self::default()
        })
    }

    /// The response returned in place of a transport failure.
    pub fn from_transport_error(err: &TransportError, request: &RequestDescriptor) -> Self {
        Self {
            status: err.message.clone(),
            request_url: request.url.clone(),
            request_parameters: request.parameters.clone(),
            error: Some(err.clone()),
            ..Self::default()
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.code)
    }

    pub fn is_transport_error(&self) -> bool {
        self.error.is_some()
    }

    /// Turn an error-flavored response into `Err(Error::Transport)`.
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(err) => Err(Error::Transport(err)),
            None => Ok(self),
        }
    }
}

fn split_head(raw: &[u8]) -> Result<(&[u8], &[u8])> {
    memchr::memmem::find(raw, HEAD_TERMINATOR)
        .map(|at| (&raw[..at], &raw[at + HEAD_TERMINATOR.len()..]))
        .ok_or_else(|| Error::MalformedResponse("no blank line between head and body".to_string()))
}

/// Whether the head's status line is a `100 Continue` interim response.
fn is_interim(head: &[u8]) -> bool {
    String::from_utf8_lossy(head)
        .lines()
        .next()
        .and_then(|line| STATUS_LINE.captures(line))
        .is_some_and(|caps| &caps["code"] == "100")
}
