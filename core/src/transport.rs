//! The transport boundary.
//!
//! The core never opens a socket. A `Transport` receives a finished
//! `RequestDescriptor` and either returns the raw response bytes (status
//! line, headers and body exactly as received, after any transfer/content
//! decoding it performs) or a `TransportError`.

use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::http::RequestDescriptor;

/// Diagnostics reported by the transport, passed through uninterpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportInfo {
    /// URL the response actually came from, after redirects.
    pub effective_url: Option<String>,
    /// Free-form extras such as timings or the local address.
    pub fields: Map<String, Value>,
}

/// A successful round-trip: undecoded bytes plus transport diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub bytes: Vec<u8>,
    pub info: TransportInfo,
}

impl RawResponse {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            info: TransportInfo::default(),
        }
    }

    #[must_use]
    pub fn with_info(mut self, info: TransportInfo) -> Self {
        self.info = info;
        self
    }
}

/// Executes a request descriptor against the network.
///
/// Implementations own connection handling, TLS, redirects and timeouts as
/// described by `RequestDescriptor::options`.
pub trait Transport {
    fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&RequestDescriptor) -> Result<RawResponse, TransportError>,
{
    fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse, TransportError> {
        self(request)
    }
}
