#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::{Method, Request, Response, StatusCode};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use hyper_util::server::conn::auto::Builder;
    use tokio::net::TcpListener;

    use rcache::{App, OriginClient};
    use rcache_store::{
        AbstractCacheStore, CacheStore, CachedResponse, MemoryCacheStore,
        StoreError,
    };

    /// Minimal key/value origin: GET under /riak answers JSON, mutations
    /// answer 204, unknown keys answer 404. Counts every request it sees.
    async fn spawn_origin() -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind origin listener");
        let addr = listener.local_addr().expect("Failed to read origin addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_accept = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let hits = hits_accept.clone();
                let service = service_fn(move |req: Request<Incoming>| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(origin_response(&req))
                    }
                });
                tokio::spawn(async move {
                    let _ = Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        (addr, hits)
    }

    fn origin_response(req: &Request<Incoming>) -> Response<Full<Bytes>> {
        let path = req.uri().path();
        let (status, body): (StatusCode, &str) = match *req.method() {
            Method::GET | Method::HEAD => {
                if path == "/riak/users/42" {
                    (StatusCode::OK, "{\"id\":42}")
                } else if path == "/riak/users/moved" {
                    (StatusCode::FOUND, "")
                } else if path == "/riak/posts/1" {
                    (StatusCode::OK, "{\"post\":1}")
                } else if path == "/status" {
                    (StatusCode::OK, "ok")
                } else {
                    (StatusCode::NOT_FOUND, "not found")
                }
            }
            Method::POST | Method::PUT | Method::DELETE => {
                (StatusCode::NO_CONTENT, "")
            }
            _ => (StatusCode::METHOD_NOT_ALLOWED, ""),
        };
        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert("content-type", "application/json".parse().unwrap());
        response
            .headers_mut()
            .insert("x-riak-vclock", "a85hYGBg=".parse().unwrap());
        if status == StatusCode::FOUND {
            response
                .headers_mut()
                .insert("location", "/riak/users/42".parse().unwrap());
        }
        response
    }

    async fn setup_app() -> (App, Arc<MemoryCacheStore>, Arc<AtomicUsize>) {
        let (addr, hits) = spawn_origin().await;
        let store = Arc::new(MemoryCacheStore::new("riak_cache"));
        let origin = OriginClient::new(&format!("http://{}", addr))
            .expect("Failed to build origin client");
        let app = App::new(store.clone(), origin);
        (app, store, hits)
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .expect("Failed to build request")
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
    }

    #[tokio::test]
    async fn test_get_caches_and_replays() {
        let (app, _store, hits) = setup_app().await;

        let first = app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(
            first.headers().get("x-riak-vclock").unwrap(),
            "a85hYGBg="
        );
        assert_eq!(body_bytes(first).await.as_ref(), b"{\"id\":42}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // second read is answered from cache, origin untouched
        let second = app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(
            second.headers().get("x-riak-vclock").unwrap(),
            "a85hYGBg="
        );
        assert_eq!(body_bytes(second).await.as_ref(), b"{\"id\":42}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_put_invalidates_entry() {
        let (app, _store, hits) = setup_app().await;

        app.handle(request(Method::GET, "/riak/users/42")).await;
        app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let put = app.handle(request(Method::PUT, "/riak/users/42")).await;
        assert_eq!(put.status(), StatusCode::NO_CONTENT);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // entry was invalidated, the next read goes to origin again
        app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_conforming_path_never_cached() {
        let (app, store, hits) = setup_app().await;

        for _ in 0..3 {
            let response = app.handle(request(Method::GET, "/status")).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(store.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_origin_redirect_is_relayed_not_followed() {
        let (app, store, hits) = setup_app().await;

        let response = app.handle(request(Method::GET, "/riak/users/moved")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/riak/users/42"
        );
        // one origin round-trip, the redirect target was never fetched
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // nothing was cached under the redirecting path
        assert!(store.get("users", "moved").await.unwrap().is_none());
        assert!(store.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_200_not_cached() {
        let (app, store, hits) = setup_app().await;

        let first = app.handle(request(Method::GET, "/riak/users/404")).await;
        assert_eq!(first.status(), StatusCode::NOT_FOUND);
        let second = app.handle(request(Method::GET, "/riak/users/404")).await;
        assert_eq!(second.status(), StatusCode::NOT_FOUND);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(store.get("users", "404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_head_bypasses_cache() {
        let (app, _store, hits) = setup_app().await;

        app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // HEAD goes to origin even with a cached entry present
        let head = app.handle(request(Method::HEAD, "/riak/users/42")).await;
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected_without_origin_contact() {
        let (app, _store, hits) = setup_app().await;

        let response = app.handle(request(Method::PATCH, "/riak/users/42")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_bytes(response).await.as_ref(), b"Method not allowed");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidate_endpoint_flushes_everything() {
        let (app, store, hits) = setup_app().await;

        app.handle(request(Method::GET, "/riak/users/42")).await;
        app.handle(request(Method::GET, "/riak/posts/1")).await;
        assert_eq!(store.list_buckets().await.unwrap().len(), 2);

        let flush = app.handle(request(Method::POST, "/invalidate")).await;
        assert_eq!(flush.status(), StatusCode::OK);
        assert!(body_bytes(flush).await.is_empty());
        assert!(store.list_buckets().await.unwrap().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // both reads go back to the origin
        app.handle(request(Method::GET, "/riak/users/42")).await;
        app.handle(request(Method::GET, "/riak/posts/1")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    /// Store that fails every operation, standing in for an unreachable
    /// backend.
    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<Option<CachedResponse>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn put(
            &self,
            _bucket: &str,
            _key: &str,
            _entry: &CachedResponse,
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn delete_key(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn register_bucket(&self, _bucket: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn delete_buckets(
            &self,
            _buckets: &[String],
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_origin() {
        let (addr, hits) = spawn_origin().await;
        let store: AbstractCacheStore = Arc::new(FailingStore);
        let origin = OriginClient::new(&format!("http://{}", addr))
            .expect("Failed to build origin client");
        let app = App::new(store, origin);

        // reads and writes still work, every request reaches the origin
        let read = app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(read.status(), StatusCode::OK);
        assert_eq!(body_bytes(read).await.as_ref(), b"{\"id\":42}");

        let write = app.handle(request(Method::PUT, "/riak/users/42")).await;
        assert_eq!(write.status(), StatusCode::NO_CONTENT);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // a flush against a dead backend reports failure but does not panic
        let flush = app.handle(request(Method::GET, "/invalidate")).await;
        assert_eq!(flush.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_origin_unreachable_yields_bad_gateway() {
        // nothing is listening on this port
        let store: AbstractCacheStore = Arc::new(MemoryCacheStore::new("riak_cache"));
        let origin = OriginClient::new("http://127.0.0.1:1")
            .expect("Failed to build origin client");
        let app = App::new(store, origin);

        let response = app.handle(request(Method::GET, "/riak/users/42")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
