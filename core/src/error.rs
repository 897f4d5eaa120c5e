//! Error types for the request pipeline.
//!
//! # Design
//! Construction problems (bad URL, empty URL, unknown method, unreadable
//! config) and decode problems are returned as `Error` from
//! `Client::request`. Transport failures are not: the dispatcher folds them
//! into an error-flavored `Response`, and `Error::Transport` only appears when
//! a caller opts in through `Response::into_result`.

use thiserror::Error;

/// Boxed failure returned by a listener callback.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A network or protocol failure reported by the transport.
///
/// `code` is transport-defined (libcurl-style numbering works well, e.g. 28
/// for a timeout); the core never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error {code}: {message}")]
pub struct TransportError {
    pub code: i32,
    pub message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors returned by the client and its building blocks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The URL string could not be parsed at all.
    #[error("malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The request cannot be built (missing URL, unknown method).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport returned bytes without a head/body boundary or status line.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Surfaced only through `Response::into_result`.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A merged config tree does not fit the typed request config.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Query string or form body encoding failed.
    #[error("form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// A listener callback failed while the client propagates listener errors.
    #[error("listener failed: {0}")]
    Listener(#[source] ListenerError),

    /// An event name other than `before`, `after` or `error`.
    #[error("unknown event '{0}'")]
    UnknownEvent(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
