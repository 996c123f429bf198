//! The scanner continuously refreshes every known profile and propagates observable changes to
//! the search index, with sign-in events prioritized over the background sweep (`spec.md` §4.5).

pub mod debounce;

use crate::config;
use crate::error::EdgeError;
use crate::kv::{KvStore, scanner_key};
use crate::metrics::{observe_upsert, set_inflight, set_queue_depth, set_scanner_sleep_millis};
use crate::mojang::Mojang;
use crate::pubsub::PubSub;
use crate::scanner::debounce::Debounce;
use crate::search::{IndexedDocument, IndexedTexture, IndexedTextures, SearchIndex};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// [Scanner] owns the dual-priority job queues, the in-flight semaphore, and the adaptive
/// self-throttle. Built once at startup and run for the lifetime of the process
/// ([Scanner::run] never returns under normal operation).
pub struct Scanner {
    mojang: Arc<dyn Mojang>,
    kv: Arc<dyn KvStore>,
    search: Arc<dyn SearchIndex>,
    pubsub: Arc<dyn PubSub>,
    sign_in_topic: String,
    priority_capacity: usize,
    non_priority_capacity: usize,
    inflight_limit: usize,
    scan_page_size: u32,
    sleep_millis: Arc<AtomicU64>,
    debounce: Debounce,
    priority_depth: Arc<AtomicI64>,
    non_priority_depth: Arc<AtomicI64>,
}

impl Scanner {
    pub fn new(
        mojang: Arc<dyn Mojang>,
        kv: Arc<dyn KvStore>,
        search: Arc<dyn SearchIndex>,
        pubsub: Arc<dyn PubSub>,
        cfg: &config::Scanner,
        sign_in_topic: String,
    ) -> Self {
        Self {
            mojang,
            kv,
            search,
            pubsub,
            sign_in_topic,
            priority_capacity: cfg.priority_queue_capacity,
            non_priority_capacity: cfg.non_priority_queue_capacity,
            inflight_limit: cfg.inflight_limit,
            scan_page_size: cfg.scan_page_size,
            sleep_millis: Arc::new(AtomicU64::new(cfg.initial_sleep_millis)),
            debounce: Debounce::new(cfg.debounce_window()),
            priority_depth: Arc::new(AtomicI64::new(0)),
            non_priority_depth: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Runs the priority producer, the non-priority producer, and the dispatch loop concurrently.
    /// Returns only if every task exits, which under normal operation never happens.
    pub async fn run(self: Arc<Self>) {
        let (priority_tx, priority_rx) = mpsc::channel(self.priority_capacity);
        let (non_priority_tx, non_priority_rx) = mpsc::channel(self.non_priority_capacity);

        let priority_producer = self.clone().run_priority_producer(priority_tx);
        let non_priority_producer = self.clone().run_non_priority_producer(non_priority_tx);
        let dispatch_loop = self.clone().run_dispatch_loop(priority_rx, non_priority_rx);

        tokio::join!(priority_producer, non_priority_producer, dispatch_loop);
    }

    async fn run_priority_producer(self: Arc<Self>, tx: mpsc::Sender<Uuid>) {
        let mut messages = match self.pubsub.subscribe(&self.sign_in_topic).await {
            Ok(rx) => rx,
            Err(err) => {
                warn!(error = %err, "failed to subscribe to sign-in topic, priority producer disabled");
                return;
            }
        };
        while let Some(payload) = messages.recv().await {
            let uuid = match Uuid::parse_str(&payload) {
                Ok(uuid) => uuid,
                Err(err) => {
                    warn!(payload, error = %err, "dropping unparsable sign-in payload");
                    continue;
                }
            };
            if tx.send(uuid).await.is_err() {
                break;
            }
            self.priority_depth.fetch_add(1, Ordering::Relaxed);
            set_queue_depth("priority", self.priority_depth.load(Ordering::Relaxed));
        }
    }

    async fn run_non_priority_producer(self: Arc<Self>, tx: mpsc::Sender<Uuid>) {
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys) = match self.kv.scan("scanner:*", cursor, self.scan_page_size).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(error = %err, "scanner sweep failed, retrying with same cursor");
                    continue;
                }
            };
            for key in keys {
                let Some(suffix) = key.split(':').nth(1) else {
                    continue;
                };
                let Ok(uuid) = Uuid::parse_str(suffix) else {
                    continue;
                };
                if tx.send(uuid).await.is_err() {
                    return;
                }
                self.non_priority_depth.fetch_add(1, Ordering::Relaxed);
                set_queue_depth("non_priority", self.non_priority_depth.load(Ordering::Relaxed));
            }
            cursor = next_cursor;
        }
    }

    async fn run_dispatch_loop(
        self: Arc<Self>,
        mut priority_rx: mpsc::Receiver<Uuid>,
        mut non_priority_rx: mpsc::Receiver<Uuid>,
    ) {
        let inflight = Arc::new(Semaphore::new(self.inflight_limit));
        loop {
            let Ok(permit) = inflight.clone().acquire_owned().await else {
                return;
            };
            set_inflight((self.inflight_limit - inflight.available_permits()) as i64);

            let (uuid, priority) = match priority_rx.try_recv() {
                Ok(uuid) => (uuid, true),
                Err(_) => {
                    let next = tokio::select! {
                        biased;
                        Some(uuid) = priority_rx.recv() => Some((uuid, true)),
                        Some(uuid) = non_priority_rx.recv() => Some((uuid, false)),
                        else => None,
                    };
                    match next {
                        Some(pair) => pair,
                        None => return,
                    }
                }
            };
            if priority {
                self.priority_depth.fetch_sub(1, Ordering::Relaxed);
                set_queue_depth("priority", self.priority_depth.load(Ordering::Relaxed));
            } else {
                self.non_priority_depth.fetch_sub(1, Ordering::Relaxed);
                set_queue_depth("non_priority", self.non_priority_depth.load(Ordering::Relaxed));
            }

            let scanner = self.clone();
            tokio::spawn(async move {
                scanner.handle_job(uuid, priority).await;
                drop(permit);
            });

            let sleep_millis = self.sleep_millis.load(Ordering::Relaxed);
            set_scanner_sleep_millis(sleep_millis);
            tokio::time::sleep(Duration::from_millis(sleep_millis)).await;
        }
    }

    #[instrument(skip(self), fields(priority))]
    async fn handle_job(&self, uuid: Uuid, priority: bool) {
        info!(%uuid, priority, "scanning profile");

        let profile = match self.mojang.fetch_profile(&uuid).await {
            Ok(profile) => profile,
            Err(EdgeError::UpstreamRateLimited) => {
                warn!(%uuid, "upstream rate limited the scanner");
                let sleep_millis = self.sleep_millis.clone();
                self.debounce.call(move || {
                    let new_value = sleep_millis.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(sleep_millis = new_value, "scanner throttle escalated");
                });
                return;
            }
            Err(err) => {
                warn!(%uuid, error = %err, "scan job dropped");
                return;
            }
        };

        let descriptor = match profile.textures() {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(%uuid, error = %err, "failed to decode textures, scan job dropped");
                return;
            }
        };

        let skin_data = match self.fetch_texture_data(descriptor.textures.skin.as_ref().map(|t| t.url.as_str())).await {
            Ok(data) => data,
            Err(err) => {
                warn!(%uuid, error = %err, "failed to fetch skin texture, scan job dropped");
                return;
            }
        };
        let cape_data = match self.fetch_texture_data(descriptor.textures.cape.as_ref().map(|t| t.url.as_str())).await {
            Ok(data) => data,
            Err(err) => {
                warn!(%uuid, error = %err, "failed to fetch cape texture, scan job dropped");
                return;
            }
        };

        let doc = IndexedDocument {
            id: uuid,
            name: profile.name,
            textures: IndexedTextures {
                skin: IndexedTexture { data: skin_data },
                cape: IndexedTexture { data: cape_data },
            },
        };

        if let Err(err) = self.upsert_if_changed(&uuid, doc).await {
            warn!(%uuid, error = %err, "scanner upsert failed");
        }
    }

    /// Fetches and base64-encodes the texture at `url`, if present. A url's texture id is the
    /// last path segment (`spec.md` §4.5 step 4/5).
    async fn fetch_texture_data(&self, url: Option<&str>) -> Result<String, EdgeError> {
        let Some(url) = url else {
            return Ok(String::new());
        };
        let texture_id = url.rsplit('/').next().unwrap_or(url);
        self.mojang.fetch_texture(texture_id).await
    }

    async fn upsert_if_changed(&self, uuid: &Uuid, doc: IndexedDocument) -> Result<(), EdgeError> {
        let key = scanner_key(uuid);
        let changed = match self.kv.get(&key).await? {
            None => true,
            Some(existing) => match serde_json::from_str::<IndexedDocument>(&existing) {
                Ok(previous) => previous != doc,
                Err(_) => true,
            },
        };

        observe_upsert(changed);
        if !changed {
            return Ok(());
        }

        let serialized = serde_json::to_string(&doc)?;
        self.kv.put(&key, &serialized, None).await?;
        self.search.add_documents(&[doc]).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Scanner as ScannerConfig;
    use crate::kv::testing::MemoryKvStore;
    use crate::mojang::testing::{HYDROFIN, MojangTestingApi};
    use crate::pubsub::testing::FakePubSub;
    use crate::search::testing::FakeSearchIndex;

    fn test_config() -> ScannerConfig {
        ScannerConfig {
            enabled: true,
            initial_sleep_millis: 1,
            debounce_millis: 50,
            inflight_limit: 2,
            priority_queue_capacity: 16,
            non_priority_queue_capacity: 16,
            scan_page_size: 128,
        }
    }

    #[tokio::test]
    async fn handle_job_creates_document_on_first_scan() {
        // given
        let kv = Arc::new(MemoryKvStore::new());
        let search = Arc::new(FakeSearchIndex::new());
        let scanner = Scanner::new(
            Arc::new(MojangTestingApi::with_profiles()),
            kv.clone(),
            search.clone(),
            Arc::new(FakePubSub::new()),
            &test_config(),
            "signIn".to_string(),
        );

        // when
        scanner.handle_job(HYDROFIN.profile.id, false).await;

        // then
        assert_eq!(1, search.call_count());
        let cached = kv.get(&scanner_key(&HYDROFIN.profile.id)).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn handle_job_is_a_no_op_when_nothing_changed() {
        // given
        let kv = Arc::new(MemoryKvStore::new());
        let search = Arc::new(FakeSearchIndex::new());
        let scanner = Scanner::new(
            Arc::new(MojangTestingApi::with_profiles()),
            kv.clone(),
            search.clone(),
            Arc::new(FakePubSub::new()),
            &test_config(),
            "signIn".to_string(),
        );

        // when
        scanner.handle_job(HYDROFIN.profile.id, false).await;
        scanner.handle_job(HYDROFIN.profile.id, false).await;

        // then
        assert_eq!(1, search.call_count());
    }

    #[tokio::test]
    async fn handle_job_drops_unknown_profile_without_panicking() {
        let scanner = Scanner::new(
            Arc::new(MojangTestingApi::new()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(FakeSearchIndex::new()),
            Arc::new(FakePubSub::new()),
            &test_config(),
            "signIn".to_string(),
        );
        scanner.handle_job(Uuid::new_v4(), false).await;
    }
}
