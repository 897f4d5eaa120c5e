//! Echo server used as a live HTTP peer in integration tests.
//!
//! `/echo` (and anything below it) answers every method with a JSON `Echo`
//! describing what arrived, and mirrors the method and query parameters into
//! `x-echo-*` response headers so HEAD requests can be checked too.
//! `/status/{code}` answers with the given status and an empty body.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What the server saw of one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    /// Body decoded as `application/x-www-form-urlencoded`, empty if it is not.
    pub form: BTreeMap<String, String>,
    pub body: String,
    pub body_length: usize,
    /// Header names lower-cased; non-UTF-8 values are dropped.
    pub headers: BTreeMap<String, String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> (HeaderMap, Json<Echo>) {
    let mut reply = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(method.as_str()) {
        reply.insert(HeaderName::from_static("x-echo-method"), value);
    }
    for (key, value) in &query {
        let name = HeaderName::try_from(format!("x-echo-query-{key}"));
        if let (Ok(name), Ok(value)) = (name, HeaderValue::from_str(value)) {
            reply.insert(name, value);
        }
    }

    let echo = Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        form: serde_urlencoded::from_bytes(&body).unwrap_or_default(),
        body: String::from_utf8_lossy(&body).into_owned(),
        body_length: body.len(),
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
    };
    (reply, Json(echo))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}
