//! A read-through caching edge for the Mojang profile and texture APIs: it fronts the
//! rate-limited upstream with a shared cache, rotates outbound requests across a pool of source
//! addresses to multiply effective quota, and runs a background scanner that keeps a search index
//! of known profiles up to date.
//!
//! # Usage
//!
//! Start the application by first initializing [tracing] (and, optionally, [sentry]) and then
//! calling [start] with the [application configuration](config) and [egress pool](config::EgressPool).
//!
//! # Configuration
//!
//! See [config] for a description of how the application configuration is assembled.

use crate::config::Config;
use crate::egress::EgressClient;
use crate::kv::KvStore;
use crate::kv::redis::RedisKvStore;
use crate::mojang::Mojang;
#[cfg(not(feature = "testing"))]
use crate::mojang::api::MojangHttpApi;
#[cfg(feature = "testing")]
use crate::mojang::testing::MojangTestingApi;
use crate::pubsub::PubSub;
use crate::pubsub::redis::RedisPubSub;
use crate::rest::AppState;
use crate::scanner::Scanner;
use crate::search::SearchIndex;
use crate::search::meili::MeiliSearchIndex;
use futures_util::FutureExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub mod config;
pub mod egress;
pub mod error;
pub mod kv;
mod metrics;
pub mod mojang;
pub mod pubsub;
pub mod rest;
pub mod scanner;
pub mod search;
pub mod service;
pub mod validate;

use crate::service::Service;

/// Starts the edge service with the provided [application configuration](Config) and
/// [egress pool](config::EgressPool). Expects [tracing] (and, optionally, [sentry]) to have
/// already been initialized. Runs the scanner and the rest server concurrently; returns only if
/// the rest server stops (on a shutdown signal) or a component fails to start.
#[tracing::instrument(skip_all)]
pub async fn start(
    config: Arc<Config>,
    egress_pool: config::EgressPool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting edge service");

    let egress = EgressClient::new(&egress_pool.pool);
    info!(pool_size = egress.pool_size(), "egress client ready");

    #[cfg(not(feature = "testing"))]
    let mojang: Arc<dyn Mojang> = Arc::new(MojangHttpApi::new(egress, config.signed_profiles));
    #[cfg(feature = "testing")]
    let mojang: Arc<dyn Mojang> = Arc::new(MojangTestingApi::with_profiles());
    let _ = &egress_pool;

    info!(address = config.kv.address, "connecting to key-value store");
    let kv: Arc<dyn KvStore> = Arc::new(RedisKvStore::connect(&config.kv.address).await?);

    info!(address = config.search.address, "connecting to search index");
    let search: Arc<dyn SearchIndex> = Arc::new(MeiliSearchIndex::new(
        &config.search.address,
        &config.search.api_key,
        &config.search.index,
    )?);

    info!(address = config.kv.address, "connecting to pub/sub broker");
    let pubsub: Arc<dyn PubSub> = Arc::new(RedisPubSub::connect(&config.kv.address).await?);

    let service = Arc::new(Service::new(
        mojang.clone(),
        kv.clone(),
        search.clone(),
        pubsub.clone(),
        config.cache.client_ttl(),
        config.sign_in.topic.clone(),
    ));

    let scanner = Arc::new(Scanner::new(
        mojang,
        kv,
        search,
        pubsub,
        &config.scanner,
        config.sign_in.topic.clone(),
    ));

    let scanner_task = async {
        if config.scanner.enabled {
            scanner.run().await;
        } else {
            info!("scanner is disabled");
            std::future::pending::<()>().await;
        }
        Ok(())
    };

    tokio::try_join!(serve_rest_server(service, &config), scanner_task)?;
    info!("edge service stopped successfully");
    Ok(())
}

/// Serves the rest server until a shutdown signal is received (graceful shutdown).
#[tracing::instrument(skip_all)]
async fn serve_rest_server(
    service: Arc<Service>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(service, config);
    let app = rest::router(state);
    let address = config.rest_server.address;

    let shutdown = tokio::signal::ctrl_c().map(|_| ());

    info!(address = %address, "rest server listening");
    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    info!("rest server stopped successfully");
    Ok(())
}
