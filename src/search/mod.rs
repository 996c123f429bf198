//! The search module keeps an external search index in sync with scanned profiles (`spec.md` §3,
//! §4.5): the scanner upserts an [IndexedDocument] whenever a scanned profile's name or texture
//! data changes.

pub mod meili;
pub mod testing;

use crate::error::EdgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The document shape written to the search index (`spec.md` §3). `data` fields are the base64
/// encoding of the raw texture PNG bytes; absent skin or cape carries empty-string data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedDocument {
    pub id: Uuid,
    pub name: String,
    pub textures: IndexedTextures,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedTextures {
    pub skin: IndexedTexture,
    pub cape: IndexedTexture,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedTexture {
    pub data: String,
}

impl IndexedTexture {
    pub fn empty() -> Self {
        Self {
            data: String::new(),
        }
    }
}

/// [SearchIndex] is the abstraction the scanner writes through. Only the add/update-documents
/// operation is needed: the scanner never reads or deletes from the index (`spec.md` §4.5).
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn add_documents(&self, documents: &[IndexedDocument]) -> Result<(), EdgeError>;

    /// Returns the value of the key named `Default Search API Key` among the backend's API keys,
    /// used by `GET /searchKey` (`spec.md` §4.4). Errors if fewer than two keys exist or none
    /// match that name.
    async fn default_search_key(&self) -> Result<String, EdgeError>;
}
