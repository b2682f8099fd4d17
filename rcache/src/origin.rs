//! Outbound leg of the proxy: forwards a buffered inbound request to the
//! configured origin and captures the full response for replay.

use bytes::Bytes;
use hyper::header::{HeaderValue, ACCEPT, HOST};
use hyper::{HeaderMap, Method};
use rcache_store::CachedResponse;
use tracing::debug;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum OriginError {
    #[error("Origin request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid origin URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Connection-level headers; never captured, never replayed.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// HTTP client bound to a single origin base URL.
pub struct OriginClient {
    http: reqwest::Client,
    base: Url,
}

impl OriginClient {
    pub fn new(origin: &str) -> Result<Self, OriginError> {
        // Redirects belong to the client: a 3xx from the origin is relayed
        // as-is, never followed here.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(origin)?,
        })
    }

    /// Forward a request to the origin and buffer its full response.
    ///
    /// The `Host` header is dropped so the client library sets it for the
    /// origin, and `Accept` is forced to `*/*` as the original proxy did.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<CachedResponse, OriginError> {
        let url = self.base.join(path_and_query)?;
        headers.remove(HOST);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let response = self
            .http
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let mut captured = Vec::new();
        for (name, value) in response.headers() {
            if HOP_BY_HOP.contains(&name.as_str()) {
                continue;
            }
            captured.push((name.as_str().to_string(), value.as_bytes().to_vec()));
        }
        let body = response.bytes().await?;
        debug!(status, path_and_query, "origin answered");

        Ok(CachedResponse {
            status,
            headers: captured,
            body: body.to_vec(),
        })
    }
}
