//! The config module defines the application configuration. It is based on [config], a layered
//! configuration system for Rust applications (with strong support for 12-factor applications).
//!
//! # Layers
//!
//! The configuration consists of up to three layers. Upper layers overwrite lower layer
//! configurations (e.g., environment variables overwrite the default configuration).
//!
//! ## Layer 1 (Environment variables) \[optional\]
//!
//! The environment variables are the top most layer. They can be used to overwrite any previous
//! configuration. Environment variables have the format `[ENV_PREFIX]_[field]_[sub_field]` where
//! `ENV_PREFIX` is an environment variable defaulting to `EDGE`. That means the nested config
//! field `kv.address` can be overwritten by the environment variable `EDGE_KV_ADDRESS`.
//!
//! ## Layer 2 (Custom configuration) \[optional\]
//!
//! The next layer is an optional configuration file intended to be used by deployments and local
//! testing. The file location can be configured using the `CONFIG_FILE` environment variable,
//! defaulting to `config/config`.
//!
//! ## Layer 3 (Default configuration)
//!
//! The default configuration provides the default value for all config fields. It is loaded from
//! `config/default.toml` at compile time.
//!
//! # Egress pool
//!
//! The egress IP pool is deployment topology, not application behavior, and is loaded separately
//! by [EgressPool::load] from the JSON file named by `egress.pool_file` (see [Egress]).

use config::{ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

/// [Cache] holds the client-facing cache TTL (`spec.md` §3: 15 minutes). Scanner-owned keys always
/// use a TTL of zero (no expiry); that is not configurable, it is the change-detection baseline.
#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
    pub client_ttl_secs: u64,
}

impl Cache {
    pub fn client_ttl(&self) -> Duration {
        Duration::from_secs(self.client_ttl_secs)
    }
}

/// [Kv] holds the address of the external key-value store backing the read-through cache.
#[derive(Debug, Clone, Deserialize)]
pub struct Kv {
    pub address: String,
}

/// [Search] holds the address, api key and index name of the external search backend that the
/// scanner keeps up to date.
#[derive(Debug, Clone, Deserialize)]
pub struct Search {
    pub address: String,
    pub api_key: String,
    pub index: String,
}

/// [SignIn] holds the shared secret required on `POST /signIn/:uuid` and the pub/sub topic that
/// publishes priority uuids to the scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct SignIn {
    pub api_key: String,
    pub topic: String,
}

/// [Scanner] holds the tuning knobs for the background profile scanner (`spec.md` §4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct Scanner {
    pub enabled: bool,
    pub initial_sleep_millis: u64,
    pub debounce_millis: u64,
    pub inflight_limit: usize,
    pub priority_queue_capacity: usize,
    pub non_priority_queue_capacity: usize,
    pub scan_page_size: u32,
}

impl Scanner {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_millis)
    }
}

/// [Egress] names the JSON file listing egress source IPs (`spec.md` §6: `ips.json`). An empty
/// path means no pool is configured and the default route is used for every request.
#[derive(Debug, Clone, Deserialize)]
pub struct Egress {
    pub pool_file: String,
}

/// [EgressPool] is the deserialized shape of the `ips.json` file: a flat list of source addresses
/// to round-robin through. Parsed independently of [Config] because it describes deployment
/// topology rather than application behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EgressPool {
    #[serde(rename = "Pool", default)]
    pub pool: Vec<String>,
}

impl EgressPool {
    /// Loads the egress pool from `path`. An empty path is not an error: it means no pool is
    /// configured, and the default system route is used (`spec.md` §4.1). A non-empty path that
    /// cannot be read or parsed is a config-missing (fatal) error.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if path.is_empty() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .map_err(|err| ConfigError::Message(format!("failed to read {path}: {err}")))?;
        serde_json::from_str(&raw)
            .map_err(|err| ConfigError::Message(format!("failed to parse {path}: {err}")))
    }
}

/// [RestServer] holds the rest server bind address. The rest server also hosts `/metrics` when
/// [Metrics::enabled].
#[derive(Debug, Clone, Deserialize)]
pub struct RestServer {
    pub address: SocketAddr,
}

/// [Metrics] controls whether the prometheus metrics endpoint is mounted.
#[derive(Debug, Clone, Deserialize)]
pub struct Metrics {
    pub enabled: bool,
}

/// [Sentry] holds the sentry configuration, mirroring the teacher's ambient error-reporting setup.
#[derive(Debug, Clone, Deserialize)]
pub struct Sentry {
    pub enabled: bool,
    pub debug: bool,
    pub address: String,
    pub environment: String,
}

/// [Config] holds all configuration for the application. One immutable instance is created on
/// startup and then shared among the application components.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Whether upstream profile fetches should request signed properties.
    pub signed_profiles: bool,
    pub cache: Cache,
    pub kv: Kv,
    pub search: Search,
    pub sign_in: SignIn,
    pub scanner: Scanner,
    pub egress: Egress,
    pub metrics: Metrics,
    pub rest_server: RestServer,
    pub sentry: Sentry,
}

impl Config {
    /// Creates a new application configuration as described in the [module documentation](crate::config).
    pub fn new() -> Result<Self, ConfigError> {
        let env_prefix = env::var("ENV_PREFIX").unwrap_or("edge".into());
        let config_file = env::var("CONFIG_FILE").unwrap_or("config/config".into());

        let s = config::Config::builder()
            .add_source(File::from_str(
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")),
                FileFormat::Toml,
            ))
            .add_source(File::with_name(&config_file).required(false))
            .add_source(Environment::with_prefix(&env_prefix).separator("_"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        let s = config::Config::builder()
            .add_source(File::from_str(
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")),
                FileFormat::Toml,
            ))
            .build()
            .expect("expected default configuration to be available");

        s.try_deserialize()
            .expect("expected default configuration to be deserializable")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_is_deserializable() {
        let config = Config::default();
        assert_eq!(900, config.cache.client_ttl_secs);
        assert_eq!("players", config.search.index);
    }

    #[test]
    fn empty_pool_file_yields_empty_pool() {
        let pool = EgressPool::load("").unwrap();
        assert!(pool.pool.is_empty());
    }

    #[test]
    fn missing_pool_file_is_an_error() {
        let err = EgressPool::load("/nonexistent/ips.json");
        assert!(err.is_err());
    }
}
