//! Synchronous HTTP client core with layered configuration and lifecycle hooks.
//!
//! # Overview
//! Builds transport-ready `RequestDescriptor` values from layered config and
//! decodes raw HTTP response bytes, leaving network I/O to a caller-supplied
//! `Transport` (host-does-IO pattern). `Client` ties the two together and
//! runs `before`/`error`/`after` listeners around each call.
//!
//! # Design
//! - Config layers (library defaults, client, call) are untyped
//!   `ConfigTree`s merged right-biased, then read through the typed
//!   `RequestConfig`.
//! - `UrlParts` decomposes URLs so embedded credentials can be moved into
//!   auth and stripped from the wire URL.
//! - Transport failures come back as an error-flavored `Response`, never as
//!   `Err`; construction and decode failures are `Err`.
//! - Each `Client` owns a mutex-guarded `ListenerRegistry`; there is no
//!   global state.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod listener;
pub mod response;
pub mod transport;
pub mod url;

pub use client::{Client, ListenerPolicy};
pub use config::{merge, ConfigTree, RequestConfig, DEFAULT_USER_AGENT};
pub use error::{Error, ListenerError, Result, TransportError};
pub use http::{build_request, Body, Credentials, Method, Params, RequestDescriptor, TransportOptions};
pub use listener::{Event, Listener, ListenerId, ListenerRegistry};
pub use response::Response;
pub use transport::{RawResponse, Transport, TransportInfo};
pub use crate::url::UrlParts;
