//! The mojang module is the typed upstream adapter (`spec.md` §4.2): it wraps the
//! [egress](crate::egress) client with the operations the service and scanner need, decodes the
//! JSON upstream returns, and base64-encodes texture bytes for cache storage and client responses.

pub mod api;
pub mod testing;

use crate::error::EdgeError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single Minecraft user profile as returned by the session server, verbatim down to field
/// names and casing (`spec.md` §3: `ProfileResponse`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ProfileProperty>,
}

/// A single property of a [ProfileResponse]. The property named `textures` carries the base64
/// encoded [TextureDescriptor].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

impl ProfileResponse {
    /// Finds and decodes the `textures` property into a [TextureDescriptor]. Fails with
    /// [EdgeError::Decode] if the property is missing, not valid base64, or not valid JSON.
    pub fn textures(&self) -> Result<TextureDescriptor, EdgeError> {
        let prop = self
            .properties
            .iter()
            .find(|prop| prop.name == "textures")
            .ok_or_else(missing_textures_property)?;
        decode_texture_descriptor(&prop.value)
    }
}

fn missing_textures_property() -> EdgeError {
    EdgeError::Decode(serde_json::Error::io(std::io::Error::other(
        "profile has no textures property",
    )))
}

/// Decodes a base64-encoded `textures` property value into a [TextureDescriptor].
pub fn decode_texture_descriptor(base64_value: &str) -> Result<TextureDescriptor, EdgeError> {
    let raw = BASE64
        .decode(base64_value)
        .map_err(|err| EdgeError::Decode(serde_json::Error::io(std::io::Error::other(err))))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// The decoded JSON blob embedded in a profile's `textures` property (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextureDescriptor {
    pub timestamp: u64,
    pub profile_id: Uuid,
    pub profile_name: String,
    #[serde(default)]
    pub signature_required: bool,
    pub textures: Textures,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Textures {
    #[serde(rename = "SKIN")]
    pub skin: Option<Texture>,
    #[serde(rename = "CAPE")]
    pub cape: Option<Texture>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Texture {
    pub url: String,
    pub metadata: Option<TextureMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextureMetadata {
    pub model: String,
}

/// The shape of `https://api.mojang.com/users/profiles/minecraft/{name}` (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsernameResponse {
    pub id: Uuid,
    pub name: String,
}

/// One item of a batched fan-out (`spec.md` §4.2, §5): carries the per-item outcome alongside the
/// id it was requested for, since the batched collection's ordering is unspecified.
#[derive(Debug, Clone)]
pub struct MultiProfileResponse {
    pub id: Uuid,
    pub result: Result<ProfileResponse, EdgeError>,
}

#[derive(Debug, Clone)]
pub struct MultiTextureResponse {
    pub id: String,
    pub result: Result<String, EdgeError>,
}

/// [Mojang] is the typed upstream adapter used by the [service](crate::service) and
/// [scanner](crate::scanner). [testing::MojangTestingApi] substitutes canned data for tests; the
/// production implementation ([api::MojangHttpApi]) talks to the real upstream through
/// [EgressClient](crate::egress::EgressClient).
#[async_trait]
pub trait Mojang: Send + Sync {
    /// Fetches a single profile by uuid. Non-OK upstream statuses are reported as
    /// [EdgeError::UpstreamStatus] / [EdgeError::UpstreamRateLimited]; the caller decides whether
    /// the failure should propagate or be swallowed (the scanner swallows, the handlers forward).
    async fn fetch_profile(&self, uuid: &Uuid) -> Result<ProfileResponse, EdgeError>;

    /// Resolves a username to a uuid.
    async fn fetch_uuid(&self, username: &str) -> Result<UsernameResponse, EdgeError>;

    /// Fetches a texture blob by its hex id and returns it base64-encoded (standard, padded).
    async fn fetch_texture(&self, texture_id: &str) -> Result<String, EdgeError>;

    /// Fetches a texture blob by its full URL and returns the raw bytes. Used by the scanner,
    /// which already has the full texture URL from the decoded descriptor and has no reason to
    /// route it back through the hex-id path.
    async fn fetch_texture_bytes(&self, url: &str) -> Result<Bytes, EdgeError>;

    /// Batched fan-out over [fetch_profile](Mojang::fetch_profile): dispatches every input
    /// concurrently and correlates results by id. Ordering of the result is unspecified.
    async fn fetch_profiles(&self, uuids: &[Uuid]) -> Vec<MultiProfileResponse>;

    /// Batched fan-out over [fetch_texture](Mojang::fetch_texture).
    async fn fetch_textures(&self, texture_ids: &[String]) -> Vec<MultiTextureResponse>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_real_shaped_descriptor() {
        let descriptor = TextureDescriptor {
            timestamp: 1700000000000,
            profile_id: Uuid::new_v4(),
            profile_name: "Hydrofin".to_string(),
            signature_required: false,
            textures: Textures {
                skin: Some(Texture {
                    url: "https://textures.minecraft.net/texture/abc123".to_string(),
                    metadata: Some(TextureMetadata {
                        model: "slim".to_string(),
                    }),
                }),
                cape: None,
            },
        };
        let json = serde_json::to_vec(&descriptor).unwrap();
        let encoded = BASE64.encode(json);

        let decoded = decode_texture_descriptor(&encoded).unwrap();
        assert_eq!(descriptor, decoded);
    }

    #[test]
    fn rejects_non_base64_value() {
        assert!(decode_texture_descriptor("not base64!!").is_err());
    }

    #[test]
    fn rejects_base64_that_is_not_json() {
        let encoded = BASE64.encode("not json");
        assert!(decode_texture_descriptor(&encoded).is_err());
    }

    #[test]
    fn profile_without_textures_property_errors() {
        let profile = ProfileResponse {
            id: Uuid::new_v4(),
            name: "Hydrofin".to_string(),
            properties: vec![],
        };
        assert!(profile.textures().is_err());
    }
}
