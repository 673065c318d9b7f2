//! Echo server used as the live peer of the client integration tests.
//!
//! # Design
//! Every unmatched route echoes the request back as JSON: method, path,
//! decoded query pairs, headers and the raw body (plus the body parsed as
//! JSON when it is valid JSON). A few fixed routes return canned statuses,
//! XML and delayed replies for status, decoder and timeout tests.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const XML_REPLY: &str = "<reply><name>inhere</name><count>3</count></reply>";

/// What the server saw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EchoReply {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, Vec<String>>,
    /// Header name to values joined with `; `.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub json: Option<serde_json::Value>,
}

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", any(status))
        .route("/xml", get(xml))
        .route("/delay/{ms}", any(delay))
        .fallback(echo)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Json<EchoReply> {
    tracing::debug!(%method, %uri, "echo");

    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        query.entry(key).or_default().push(value);
    }

    let mut header_map = BTreeMap::new();
    for name in headers.keys() {
        let values: Vec<_> = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        header_map.insert(name.as_str().to_string(), values.join("; "));
    }

    Json(EchoReply {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers: header_map,
        body: String::from_utf8_lossy(&body).into_owned(),
        json: serde_json::from_slice(&body).ok(),
    })
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn xml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], XML_REPLY)
}

async fn delay(Path(ms): Path<u64>) -> StatusCode {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    StatusCode::OK
}
