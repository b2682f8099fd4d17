use std::sync::Arc;

use rcache::{App, OriginClient, ProxyConfig};
use rcache_store::RedisCacheStore;
use rustis::client::Client;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ProxyConfig::from_file(path)?,
        None => ProxyConfig::default(),
    };
    tracing::info!(?config, "starting rcache");

    let redis = Client::connect(config.redis_uri.clone()).await?;
    let store = Arc::new(RedisCacheStore::new(redis, &config.key_prefix));
    let origin = OriginClient::new(&config.origin)?;
    let app = Arc::new(App::new(store, origin));

    rcache::server::serve(config.listen, app).await
}
