//! The service module orchestrates the read-through cache pattern shared by every client-facing
//! lookup (`spec.md` §4.3, §4.4): cache-get, fall through to the upstream adapter on miss, cache-put
//! on success, never cache a failure. It also owns the sign-in/sign-up side effects.

use crate::error::EdgeError;
use crate::kv::{KvStore, profile_key, store_key, texture_key};
use crate::mojang::{Mojang, ProfileResponse};
use crate::pubsub::PubSub;
use crate::search::SearchIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// [Service] is the shared orchestration layer behind the REST handlers. One instance is built at
/// startup and held behind an `Arc` so every request task can use it concurrently
/// (`spec.md` §5: handlers share no mutable state beyond the cache, egress counter and connection
/// pools, all of which are internally thread-safe).
pub struct Service {
    mojang: Arc<dyn Mojang>,
    kv: Arc<dyn KvStore>,
    search: Arc<dyn SearchIndex>,
    pubsub: Arc<dyn PubSub>,
    cache_ttl: Duration,
    sign_in_topic: String,
}

/// Whether a lookup was satisfied from cache or required an upstream fetch, used for the
/// `edge_requests` metric and the one-line-per-request log (`spec.md` §4.4, §A.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
}

impl Outcome {
    pub fn metric_label(self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
        }
    }
}

impl Service {
    pub fn new(
        mojang: Arc<dyn Mojang>,
        kv: Arc<dyn KvStore>,
        search: Arc<dyn SearchIndex>,
        pubsub: Arc<dyn PubSub>,
        cache_ttl: Duration,
        sign_in_topic: String,
    ) -> Self {
        Self {
            mojang,
            kv,
            search,
            pubsub,
            cache_ttl,
            sign_in_topic,
        }
    }

    /// Fetches a single profile (`spec.md` §4.3 singleton read-through). Returns the JSON body to
    /// send verbatim plus the outcome for logging.
    pub async fn get_profile(&self, uuid: Uuid) -> Result<(String, Outcome), EdgeError> {
        let key = profile_key(&uuid);
        if let Some(cached) = self.kv.get(&key).await? {
            return Ok((cached, Outcome::Hit));
        }

        let profile = self.mojang.fetch_profile(&uuid).await?;
        let body = serde_json::to_string(&profile)?;
        if let Err(err) = self.kv.put(&key, &body, Some(self.cache_ttl)).await {
            warn!(uuid = %uuid, error = %err, "failed to cache profile, continuing");
        }
        Ok((body, Outcome::Miss))
    }

    /// Fetches a batch of profiles (`spec.md` §4.3 batched read-through). All-or-nothing: any
    /// upstream failure fails the whole request.
    pub async fn get_profiles(&self, uuids: &[Uuid]) -> Result<Vec<ProfileResponse>, EdgeError> {
        let mut results = Vec::with_capacity(uuids.len());
        let mut misses = Vec::new();
        for uuid in uuids {
            match self.kv.get(&profile_key(uuid)).await? {
                Some(cached) => results.push(serde_json::from_str::<ProfileResponse>(&cached)?),
                None => misses.push(*uuid),
            }
        }

        if !misses.is_empty() {
            let fetched = self.mojang.fetch_profiles(&misses).await;
            for item in fetched {
                let profile = item.result?;
                let body = serde_json::to_string(&profile)?;
                if let Err(err) = self
                    .kv
                    .put(&profile_key(&profile.id), &body, Some(self.cache_ttl))
                    .await
                {
                    warn!(uuid = %profile.id, error = %err, "failed to cache profile, continuing");
                }
                results.push(profile);
            }
        }

        Ok(results)
    }

    /// Fetches a single texture by hex id, returning the base64 body.
    pub async fn get_texture(&self, texture_id: &str) -> Result<(String, Outcome), EdgeError> {
        let key = texture_key(texture_id);
        if let Some(cached) = self.kv.get(&key).await? {
            return Ok((cached, Outcome::Hit));
        }

        let encoded = self.mojang.fetch_texture(texture_id).await?;
        if let Err(err) = self.kv.put(&key, &encoded, Some(self.cache_ttl)).await {
            warn!(texture_id, error = %err, "failed to cache texture, continuing");
        }
        Ok((encoded, Outcome::Miss))
    }

    /// Fetches a batch of textures by hex id.
    pub async fn get_textures(&self, texture_ids: &[String]) -> Result<Vec<String>, EdgeError> {
        let mut results = Vec::with_capacity(texture_ids.len());
        let mut misses = Vec::new();
        for id in texture_ids {
            match self.kv.get(&texture_key(id)).await? {
                Some(cached) => results.push(cached),
                None => misses.push(id.clone()),
            }
        }

        if !misses.is_empty() {
            let fetched = self.mojang.fetch_textures(&misses).await;
            for item in fetched {
                let encoded = item.result?;
                if let Err(err) = self
                    .kv
                    .put(&texture_key(&item.id), &encoded, Some(self.cache_ttl))
                    .await
                {
                    warn!(texture_id = item.id, error = %err, "failed to cache texture, continuing");
                }
                results.push(encoded);
            }
        }

        Ok(results)
    }

    /// `GET /searchKey` (`spec.md` §4.4).
    pub async fn search_key(&self) -> Result<String, EdgeError> {
        self.search.default_search_key().await
    }

    /// Publishes `uuid` on the sign-in topic so the scanner's priority producer picks it up
    /// (`spec.md` §4.6).
    pub async fn sign_in(&self, uuid: Uuid) -> Result<(), EdgeError> {
        self.pubsub
            .publish(&self.sign_in_topic, &uuid.simple().to_string())
            .await
    }

    /// Writes the `store:<uuid>` marker (TTL 0) consumed nowhere downstream of this service; it
    /// exists purely as a durable record that a client completed sign-up for `uuid`.
    pub async fn sign_up(&self, uuid: Uuid) -> Result<(), EdgeError> {
        self.kv.put(&store_key(&uuid), "", None).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kv::testing::MemoryKvStore;
    use crate::mojang::testing::{HYDROFIN, MojangTestingApi};
    use crate::pubsub::testing::FakePubSub;
    use crate::search::testing::FakeSearchIndex;

    fn build_service() -> Service {
        Service::new(
            Arc::new(MojangTestingApi::with_profiles()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(FakeSearchIndex::new()),
            Arc::new(FakePubSub::new()),
            Duration::from_secs(900),
            "signIn".to_string(),
        )
    }

    #[tokio::test]
    async fn first_profile_lookup_is_a_miss_second_is_a_hit() {
        // given
        let service = build_service();

        // when
        let (_, first) = service.get_profile(HYDROFIN.profile.id).await.unwrap();
        let (_, second) = service.get_profile(HYDROFIN.profile.id).await.unwrap();

        // then
        assert_eq!(Outcome::Miss, first);
        assert_eq!(Outcome::Hit, second);
    }

    #[tokio::test]
    async fn unknown_profile_errors() {
        let service = build_service();
        assert!(service.get_profile(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn batched_profiles_merges_cached_and_fetched() {
        // given
        let service = build_service();
        service.get_profile(HYDROFIN.profile.id).await.unwrap();
        let other = crate::mojang::testing::SCRAYOS.profile.id;

        // when
        let results = service
            .get_profiles(&[HYDROFIN.profile.id, other])
            .await
            .unwrap();

        // then
        assert_eq!(2, results.len());
    }

    #[tokio::test]
    async fn sign_up_writes_a_marker() {
        let service = build_service();
        let uuid = Uuid::new_v4();
        service.sign_up(uuid).await.unwrap();
        assert!(service.kv.exists(&store_key(&uuid)).await.unwrap());
    }

    #[tokio::test]
    async fn sign_in_publishes_on_the_configured_topic() {
        let pubsub = Arc::new(FakePubSub::new());
        let mut rx = pubsub.subscribe("signIn").await.unwrap();
        let service = Service::new(
            Arc::new(MojangTestingApi::with_profiles()),
            Arc::new(MemoryKvStore::new()),
            Arc::new(FakeSearchIndex::new()),
            pubsub,
            Duration::from_secs(900),
            "signIn".to_string(),
        );
        let uuid = Uuid::new_v4();

        service.sign_in(uuid).await.unwrap();

        assert_eq!(Some(uuid.simple().to_string()), rx.recv().await);
    }
}
