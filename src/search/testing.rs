//! [FakeSearchIndex] records every `add_documents` call instead of talking to a real backend, so
//! tests can assert on exactly what the scanner decided to upsert.

use crate::error::EdgeError;
use crate::search::{IndexedDocument, SearchIndex};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeSearchIndex {
    calls: Mutex<Vec<Vec<IndexedDocument>>>,
    search_key: Mutex<Option<String>>,
}

impl FakeSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_key(key: &str) -> Self {
        let fake = Self::default();
        *fake.search_key.lock().expect("lock poisoned") = Some(key.to_string());
        fake
    }

    /// The documents submitted across every `add_documents` call, in submission order.
    pub fn upserted_documents(&self) -> Vec<IndexedDocument> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn add_documents(&self, documents: &[IndexedDocument]) -> Result<(), EdgeError> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push(documents.to_vec());
        Ok(())
    }

    async fn default_search_key(&self) -> Result<String, EdgeError> {
        self.search_key
            .lock()
            .expect("lock poisoned")
            .clone()
            .ok_or_else(|| EdgeError::SearchIndex("no search key configured".to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use uuid::Uuid;

    fn doc(name: &str) -> IndexedDocument {
        IndexedDocument {
            id: Uuid::new_v4(),
            name: name.to_string(),
            textures: crate::search::IndexedTextures {
                skin: crate::search::IndexedTexture::empty(),
                cape: crate::search::IndexedTexture::empty(),
            },
        }
    }

    #[tokio::test]
    async fn records_submitted_documents() {
        let index = FakeSearchIndex::new();
        index.add_documents(&[doc("Hydrofin")]).await.unwrap();
        index.add_documents(&[doc("Scrayos")]).await.unwrap();

        assert_eq!(2, index.call_count());
        assert_eq!(2, index.upserted_documents().len());
    }

    #[tokio::test]
    async fn missing_search_key_errors() {
        let index = FakeSearchIndex::new();
        assert!(index.default_search_key().await.is_err());
    }

    #[tokio::test]
    async fn configured_search_key_is_returned() {
        let index = FakeSearchIndex::with_search_key("abc123");
        assert_eq!("abc123", index.default_search_key().await.unwrap());
    }
}
