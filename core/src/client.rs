//! Synchronous request dispatcher.
//!
//! # Design
//! `Client` holds its base configuration, a transport and its own listener
//! registry. Each call runs the same fixed pipeline on the calling thread:
//!
//! 1. merge library defaults, client config and per-call config
//! 2. normalize parameters and resolve the method
//! 3. build the `RequestDescriptor` (URL credentials are lifted into auth)
//! 4. run `before` listeners, which may edit the descriptor
//! 5. call the transport and decode its bytes, or turn its error into an
//!    error-flavored `Response` and run `error` listeners
//! 6. run `after` listeners on either path
//!
//! Transport failures never surface as `Err`; construction and decode
//! failures do.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{merge, ConfigTree};
use crate::error::{Error, ListenerError, Result};
use crate::http::{build_request, Method, Params};
use crate::listener::{Event, Listener, ListenerId, ListenerRegistry};
use crate::response::Response;
use crate::transport::Transport;

/// What to do when a listener returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenerPolicy {
    /// Stop the dispatch and return `Error::Listener`.
    #[default]
    Propagate,
    /// Log the failure and keep going.
    Log,
}

/// HTTP client over a caller-supplied `Transport`.
#[derive(Debug)]
pub struct Client<T> {
    config: ConfigTree,
    transport: T,
    listeners: ListenerRegistry,
    listener_policy: ListenerPolicy,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ConfigTree::new())
    }

    /// Create a client whose `config` sits between the library defaults and
    /// per-call config in precedence.
    pub fn with_config(transport: T, config: ConfigTree) -> Self {
        Self {
            config,
            transport,
            listeners: ListenerRegistry::new(),
            listener_policy: ListenerPolicy::default(),
        }
    }

    #[must_use]
    pub fn listener_policy(mut self, policy: ListenerPolicy) -> Self {
        self.listener_policy = policy;
        self
    }

    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn get(&self, url: &str, params: impl Into<Params>, config: &ConfigTree) -> Result<Response> {
        self.request(url, params, config, Method::Get)
    }

    pub fn post(&self, url: &str, params: impl Into<Params>, config: &ConfigTree) -> Result<Response> {
        self.request(url, params, config, Method::Post)
    }

    pub fn put(&self, url: &str, params: impl Into<Params>, config: &ConfigTree) -> Result<Response> {
        self.request(url, params, config, Method::Put)
    }

    pub fn delete(&self, url: &str, params: impl Into<Params>, config: &ConfigTree) -> Result<Response> {
        self.request(url, params, config, Method::Delete)
    }

    pub fn head(&self, url: &str, params: impl Into<Params>, config: &ConfigTree) -> Result<Response> {
        self.request(url, params, config, Method::Head)
    }

    /// Build and send one request.
    ///
    /// Returns `Err` for URL/config/request construction problems, for a
    /// transport reply that cannot be decoded and, under
    /// `ListenerPolicy::Propagate`, for a failing listener. A transport error
    /// yields `Ok` with `Response::error` set.
    pub fn request(
        &self,
        url: &str,
        params: impl Into<Params>,
        config: &ConfigTree,
        method: Method,
    ) -> Result<Response> {
        let parameters = params.into().into_map()?;
        let parameters_value: Map<String, Value> = parameters
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let merged = merge(&ConfigTree::defaults(), &[&self.config, config])
            .with("method", method.as_str())
            .with("parameters", parameters_value);

        let mut request = build_request(url, &merged)?;
        debug!(method = %request.method, url = %request.url, "dispatching request");

        for handler in self.listeners.before_handlers() {
            self.settle(Event::Before, handler(&mut request))?;
        }

        let response = match self.transport.execute(&request) {
            Ok(raw) => {
                let mut response = Response::decode(&raw.bytes)?;
                response.request_url = raw
                    .info
                    .effective_url
                    .clone()
                    .unwrap_or_else(|| request.url.clone());
                response.request_parameters = request.parameters.clone();
                response.info = raw.info;
                response
            }
            Err(err) => {
                warn!(code = err.code, message = %err.message, url = %request.url, "transport failed");
                let response = Response::from_transport_error(&err, &request);
                for handler in self.listeners.error_handlers() {
                    self.settle(Event::Error, handler(err.code, &err.message, &request))?;
                }
                response
            }
        };

        for handler in self.listeners.after_handlers() {
            self.settle(Event::After, handler(&request, &response))?;
        }

        debug!(code = response.code, status = %response.status, "request finished");
        Ok(response)
    }

    pub fn add_listener(&self, listener: Listener) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, event: Event, id: ListenerId) -> bool {
        self.listeners.remove(event, id)
    }

    /// Remove all listeners for `event`, or every listener when `None`.
    pub fn remove_listeners(&self, event: Option<Event>) {
        self.listeners.clear(event);
    }

    pub fn listeners(&self, event: Option<Event>) -> Vec<(Event, ListenerId)> {
        self.listeners.ids(event)
    }

    pub fn listener(&self, event: Event, id: ListenerId) -> Option<Listener> {
        self.listeners.get(event, id)
    }

    fn settle(&self, event: Event, outcome: Result<(), ListenerError>) -> Result<()> {
        match (outcome, self.listener_policy) {
            (Ok(()), _) => Ok(()),
            (Err(err), ListenerPolicy::Propagate) => Err(Error::Listener(err)),
            (Err(err), ListenerPolicy::Log) => {
                warn!(%event, error = %err, "listener failed, continuing");
                Ok(())
            }
        }
    }
}
