//! The egress module implements the outbound HTTP client used to reach the upstream identity and
//! texture service. It round-robins through a configured pool of local source addresses so that
//! the upstream's per-source-IP rate limit is spread across many addresses instead of one
//! (`spec.md` §4.1).

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// The maximum number of concurrent connections the client keeps open per destination host.
const CONNECTIONS_PER_HOST: usize = 1000;

/// [EgressClient] performs outbound GETs, optionally rotating through a pool of local source
/// addresses. Round-robin (rather than hashing) is used because request identity is unknown and
/// the upstream's quota is flat per source IP.
#[derive(Debug)]
pub struct EgressClient {
    /// One [reqwest::Client] per pool entry (each bound to a distinct local address), or a single
    /// unbound client if the pool is empty.
    clients: Vec<Client>,
    /// Process-wide, monotonic counter used to pick the next pool entry. Never resets.
    next: AtomicU32,
}

impl EgressClient {
    /// Builds a new [EgressClient]. `pool` is the list of local source addresses to round-robin
    /// through; an empty pool means every request uses the default system route.
    pub fn new(pool: &[String]) -> Self {
        let addrs: Vec<IpAddr> = pool
            .iter()
            .filter_map(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(err) => {
                    warn!(address = raw, error = %err, "skipping unparseable egress address");
                    None
                }
            })
            .collect();

        let clients = if addrs.is_empty() {
            vec![
                Client::builder()
                    .pool_max_idle_per_host(CONNECTIONS_PER_HOST)
                    .build()
                    .expect("default reqwest client configuration is valid"),
            ]
        } else {
            addrs
                .into_iter()
                .map(|addr| {
                    Client::builder()
                        .local_address(addr)
                        .pool_max_idle_per_host(CONNECTIONS_PER_HOST)
                        .build()
                        .expect("reqwest client configuration is valid")
                })
                .collect()
        };

        Self {
            clients,
            next: AtomicU32::new(0),
        }
    }

    /// Selects the next client in round-robin order. Safe under concurrent callers: the counter
    /// is a single atomic add-and-fetch, wraparound is well-defined modulo the pool size.
    fn next_client(&self) -> &Client {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) as usize % self.clients.len();
        &self.clients[idx]
    }

    /// Performs a GET against `url`. Returns the status and raw body on any response the upstream
    /// actually sent (including non-2xx); transport failures (the request never got a response)
    /// propagate as [reqwest::Error].
    pub async fn get(&self, url: &str) -> Result<(StatusCode, Bytes), reqwest::Error> {
        let start = Instant::now();
        let response = self.next_client().get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(url, status = status.as_u16(), elapsed = ?start.elapsed(), "egress request completed");
        Ok((status, body))
    }

    /// The number of distinct source addresses being rotated through. `1` when no pool is
    /// configured (the default route counts as a single "entry").
    pub fn pool_size(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_pool_has_single_default_client() {
        let client = EgressClient::new(&[]);
        assert_eq!(1, client.pool_size());
    }

    #[test]
    fn invalid_addresses_are_skipped() {
        let client = EgressClient::new(&["not-an-ip".to_string()]);
        assert_eq!(1, client.pool_size());
    }

    #[test]
    fn round_robin_distributes_evenly_over_many_selections() {
        let pool = vec![
            "10.0.0.4".to_string(),
            "10.0.0.5".to_string(),
            "10.0.0.6".to_string(),
        ];
        let client = EgressClient::new(&pool);
        assert_eq!(3, client.pool_size());

        // selecting 3*k times should visit each client exactly k times
        let mut counts = vec![0usize; 3];
        for _ in 0..300 {
            let idx = client.next.fetch_add(1, Ordering::Relaxed) as usize % client.pool_size();
            counts[idx] += 1;
        }
        for count in counts {
            assert_eq!(100, count);
        }
    }
}
