//! The production [MeiliSearchIndex] implementation, backed by [meilisearch_sdk].

use crate::error::EdgeError;
use crate::search::{IndexedDocument, SearchIndex};
use async_trait::async_trait;
use meilisearch_sdk::client::Client;

const DEFAULT_SEARCH_KEY_NAME: &str = "Default Search API Key";

/// [MeiliSearchIndex] talks to a single named index on a Meilisearch instance.
pub struct MeiliSearchIndex {
    client: Client,
    index_name: String,
}

impl MeiliSearchIndex {
    pub fn new(address: &str, api_key: &str, index_name: &str) -> Result<Self, EdgeError> {
        let key = (!api_key.is_empty()).then_some(api_key);
        let client = Client::new(address, key)
            .map_err(|err| EdgeError::SearchIndex(err.to_string()))?;
        Ok(Self {
            client,
            index_name: index_name.to_string(),
        })
    }
}

#[async_trait]
impl SearchIndex for MeiliSearchIndex {
    async fn add_documents(&self, documents: &[IndexedDocument]) -> Result<(), EdgeError> {
        self.client
            .index(&self.index_name)
            .add_documents(documents, Some("id"))
            .await
            .map_err(|err| EdgeError::SearchIndex(err.to_string()))?;
        Ok(())
    }

    async fn default_search_key(&self) -> Result<String, EdgeError> {
        let keys = self
            .client
            .get_keys()
            .await
            .map_err(|err| EdgeError::SearchIndex(err.to_string()))?;
        if keys.results.len() < 2 {
            return Err(EdgeError::SearchIndex(
                "search backend does not expose at least two keys".to_string(),
            ));
        }
        keys.results
            .into_iter()
            .find(|key| key.name.as_deref() == Some(DEFAULT_SEARCH_KEY_NAME))
            .map(|key| key.key)
            .ok_or_else(|| {
                EdgeError::SearchIndex(format!("no key named '{DEFAULT_SEARCH_KEY_NAME}'"))
            })
    }
}
