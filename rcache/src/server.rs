//! Inbound HTTP surface: request classification and the hyper serve loop.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Body, service::service_fn, Method, Request, Response, StatusCode,
};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use rcache_store::{AbstractCacheStore, CacheKey, CachedResponse};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::intercept::{CachePopulate, Interceptor, Invalidate, PassThrough};
use crate::invalidate::Invalidator;
use crate::origin::OriginClient;

/// Administrative endpoint triggering a global cache flush. Matched before
/// method dispatch, so it is reachable regardless of verb.
pub const INVALIDATE_PATH: &str = "/invalidate";

type RespBody = Full<Bytes>;

/// The proxy application: one cache store, one origin, and the per-route
/// interceptors built over them. Shared across connections behind an `Arc`.
pub struct App {
    store: AbstractCacheStore,
    origin: OriginClient,
    populate: CachePopulate,
    invalidate: Invalidate,
    pass_through: PassThrough,
    invalidator: Invalidator,
}

impl App {
    pub fn new(store: AbstractCacheStore, origin: OriginClient) -> Self {
        Self {
            populate: CachePopulate::new(store.clone()),
            invalidate: Invalidate::new(store.clone()),
            pass_through: PassThrough,
            invalidator: Invalidator::new(store.clone()),
            store,
            origin,
        }
    }

    /// Classify and handle one inbound request.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<RespBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        info!(%method, %path, "request");

        if path == INVALIDATE_PATH {
            return match self.invalidator.invalidate_all().await {
                Ok(()) => build_response(StatusCode::OK, Bytes::new()),
                Err(err) => {
                    warn!(%err, "global invalidation failed");
                    build_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "cache flush failed",
                    )
                }
            };
        }

        match method {
            Method::HEAD => self.forward(req, &self.pass_through).await,
            Method::GET => self.handle_get(req).await,
            Method::POST | Method::PUT | Method::DELETE => {
                self.forward(req, &self.invalidate).await
            }
            _ => build_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        }
    }

    /// Cache-readable route: answer from the store on a hit, otherwise
    /// forward with the populate interceptor. Any cache-side failure
    /// degrades to a plain origin round-trip.
    async fn handle_get<B>(&self, req: Request<B>) -> Response<RespBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let path = req.uri().path().to_string();
        let Some(cache_key) = CacheKey::from_path(&path) else {
            return self.forward(req, &self.pass_through).await;
        };

        match self.store.get(&cache_key.bucket, &cache_key.key).await {
            Ok(Some(entry)) => {
                if let Some(response) = replay(&entry) {
                    info!(bucket = %cache_key.bucket, key = %cache_key.key, "cache hit");
                    return response;
                }
                warn!(%path, "cached entry not replayable, forwarding");
            }
            Ok(None) => {}
            Err(err) => warn!(%err, %path, "cache lookup failed, forwarding"),
        }
        self.forward(req, &self.populate).await
    }

    /// Buffer the inbound request, forward it to the origin, let the
    /// interceptor observe the response, then relay it to the client.
    async fn forward<B>(
        &self,
        req: Request<B>,
        interceptor: &dyn Interceptor,
    ) -> Response<RespBody>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                warn!(%err, %path, "failed to read request body");
                return build_response(StatusCode::BAD_REQUEST, "invalid request body");
            }
        };

        match self
            .origin
            .forward(parts.method, &path_and_query, parts.headers, body)
            .await
        {
            Ok(origin_response) => {
                interceptor.observe(&path, &origin_response).await;
                replay(&origin_response).unwrap_or_else(|| {
                    build_response(
                        StatusCode::BAD_GATEWAY,
                        "origin response not relayable",
                    )
                })
            }
            Err(err) => {
                warn!(%err, %path, "origin unreachable");
                build_response(StatusCode::BAD_GATEWAY, "origin unreachable")
            }
        }
    }
}

/// Rebuild an HTTP response from a captured entry, reproducing status,
/// every header pair, and the exact body. `None` when the stored status or
/// headers do not form valid HTTP.
fn replay(entry: &CachedResponse) -> Option<Response<RespBody>> {
    let status = StatusCode::from_u16(entry.status).ok()?;
    let mut builder = Response::builder().status(status);
    for (name, value) in &entry.headers {
        builder = builder.header(name.as_str(), value.as_slice());
    }
    builder.body(Full::new(Bytes::from(entry.body.clone()))).ok()
}

fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<RespBody> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

/// Accept loop: one spawned task per connection, requests handled
/// independently with no shared per-request state.
pub async fn serve(
    addr: SocketAddr,
    app: Arc<App>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let app = app.clone();
        let service = service_fn(move |req| {
            let app = app.clone();
            async move { Ok::<_, Infallible>(app.handle(req).await) }
        });
        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::error!(?err, "connection error");
            }
        });
    }
}
