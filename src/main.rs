use profile_edge::config::{Config, EgressPool};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::new().expect("failed to load application configuration"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .with(config.sentry.enabled.then(sentry_tracing::layer))
        .init();

    let _guard = config.sentry.enabled.then(|| {
        sentry::init((
            config.sentry.address.clone(),
            sentry::ClientOptions {
                debug: config.sentry.debug,
                environment: Some(config.sentry.environment.clone().into()),
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let egress_pool = EgressPool::load(&config.egress.pool_file)
        .expect("failed to load egress pool configuration");

    profile_edge::start(config, egress_pool).await
}
