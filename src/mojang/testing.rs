//! [MojangTestingApi] is a [Mojang] implementation backed by in-memory fixtures instead of the
//! real upstream. Used by integration tests and by anything built against the `testing` feature.

use crate::error::EdgeError;
use crate::mojang::{
    Mojang, MultiProfileResponse, MultiTextureResponse, ProfileProperty, ProfileResponse, Texture,
    TextureDescriptor, Textures, UsernameResponse,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::LazyLock;
use uuid::{Uuid, uuid};

/// The testing profile of Hydrofin, one of two fixed fixtures every test can rely on being
/// present whenever [MojangTestingApi::with_profiles] is used.
pub static HYDROFIN: LazyLock<TestingProfile> = LazyLock::new(|| {
    TestingProfile::new(
        uuid!("09879557-e479-45a9-b434-a56377674627"),
        "Hydrofin",
        Bytes::from_static(b"hydrofin-skin-bytes"),
        None,
    )
});

/// The testing profile of Scrayos.
pub static SCRAYOS: LazyLock<TestingProfile> = LazyLock::new(|| {
    TestingProfile::new(
        uuid!("9c09eef4-f68d-4387-9751-72bbff53d5a0"),
        "Scrayos",
        Bytes::from_static(b"scrayos-skin-bytes"),
        Some(Bytes::from_static(b"scrayos-cape-bytes")),
    )
});

/// A [TestingProfile] is a canned profile with an optional cape, used to seed a
/// [MojangTestingApi].
#[derive(Debug, Clone)]
pub struct TestingProfile {
    pub profile: ProfileResponse,
    pub skin: Bytes,
    pub cape: Option<Bytes>,
    skin_url: String,
    cape_url: Option<String>,
}

impl TestingProfile {
    pub fn new(id: Uuid, name: &str, skin: Bytes, cape: Option<Bytes>) -> Self {
        let skin_url = format!("https://textures.minecraft.net/texture/skin_{}", id.simple());
        let cape_url = cape
            .is_some()
            .then(|| format!("https://textures.minecraft.net/texture/cape_{}", id.simple()));

        let descriptor = TextureDescriptor {
            timestamp: 0,
            profile_id: id,
            profile_name: name.to_string(),
            signature_required: false,
            textures: Textures {
                skin: Some(Texture {
                    url: skin_url.clone(),
                    metadata: None,
                }),
                cape: cape_url.clone().map(|url| Texture {
                    url,
                    metadata: None,
                }),
            },
        };
        let encoded = BASE64.encode(serde_json::to_vec(&descriptor).expect("descriptor encodes"));

        TestingProfile {
            profile: ProfileResponse {
                id,
                name: name.to_string(),
                properties: vec![ProfileProperty {
                    name: "textures".to_string(),
                    value: encoded,
                    signature: None,
                }],
            },
            skin,
            cape,
            skin_url,
            cape_url,
        }
    }
}

/// [MojangTestingApi] substitutes canned data for the real upstream (`spec.md` §8: testable
/// properties/scenarios rely on fixed, known responses rather than live network calls).
#[derive(Default, Debug)]
pub struct MojangTestingApi {
    uuids: HashMap<String, UsernameResponse>,
    profiles: HashMap<Uuid, ProfileResponse>,
    textures: HashMap<String, Bytes>,
}

impl MojangTestingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// An api pre-loaded with the [HYDROFIN] and [SCRAYOS] fixtures.
    pub fn with_profiles() -> Self {
        Self::new().add_profile(&HYDROFIN).add_profile(&SCRAYOS)
    }

    pub fn add_profile(mut self, profile: &TestingProfile) -> Self {
        self.uuids.insert(
            profile.profile.name.to_lowercase(),
            UsernameResponse {
                id: profile.profile.id,
                name: profile.profile.name.clone(),
            },
        );
        self.profiles
            .insert(profile.profile.id, profile.profile.clone());
        self.textures.insert(profile.skin_url.clone(), profile.skin.clone());
        if let (Some(cape_url), Some(cape)) = (&profile.cape_url, &profile.cape) {
            self.textures.insert(cape_url.clone(), cape.clone());
        }
        self
    }
}

#[async_trait]
impl Mojang for MojangTestingApi {
    async fn fetch_profile(&self, uuid: &Uuid) -> Result<ProfileResponse, EdgeError> {
        self.profiles
            .get(uuid)
            .cloned()
            .ok_or_else(|| EdgeError::from_status(reqwest::StatusCode::NOT_FOUND))
    }

    async fn fetch_uuid(&self, username: &str) -> Result<UsernameResponse, EdgeError> {
        self.uuids
            .get(&username.to_lowercase())
            .cloned()
            .ok_or_else(|| EdgeError::from_status(reqwest::StatusCode::NOT_FOUND))
    }

    async fn fetch_texture(&self, texture_id: &str) -> Result<String, EdgeError> {
        let url = format!("https://textures.minecraft.net/texture/{texture_id}");
        let bytes = self.fetch_texture_bytes(&url).await?;
        Ok(BASE64.encode(bytes))
    }

    async fn fetch_texture_bytes(&self, url: &str) -> Result<Bytes, EdgeError> {
        self.textures
            .get(url)
            .cloned()
            .ok_or_else(|| EdgeError::from_status(reqwest::StatusCode::NOT_FOUND))
    }

    async fn fetch_profiles(&self, uuids: &[Uuid]) -> Vec<MultiProfileResponse> {
        let mut out = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            out.push(MultiProfileResponse {
                id: *uuid,
                result: self.fetch_profile(uuid).await,
            });
        }
        out
    }

    async fn fetch_textures(&self, texture_ids: &[String]) -> Vec<MultiTextureResponse> {
        let mut out = Vec::with_capacity(texture_ids.len());
        for id in texture_ids {
            out.push(MultiTextureResponse {
                id: id.clone(),
                result: self.fetch_texture(id).await,
            });
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn new_empty_resolves_nothing() {
        let api = MojangTestingApi::new();
        assert!(api.fetch_uuid("hydrofin").await.is_err());
    }

    #[tokio::test]
    async fn with_profiles_has_two_fixtures() {
        let api = MojangTestingApi::with_profiles();
        assert_eq!(2, api.uuids.len());
        assert_eq!(2, api.profiles.len());
    }

    #[tokio::test]
    async fn resolves_hydrofin_uuid() {
        let api = MojangTestingApi::with_profiles();
        let resolved = api.fetch_uuid("hydrofin").await.unwrap();
        assert_eq!(HYDROFIN.profile.id, resolved.id);
    }

    #[tokio::test]
    async fn fetches_scrayos_profile_and_decodes_textures() {
        let api = MojangTestingApi::with_profiles();
        let profile = api.fetch_profile(&SCRAYOS.profile.id).await.unwrap();
        let descriptor = profile.textures().unwrap();
        assert_eq!("Scrayos", descriptor.profile_name);
        assert!(descriptor.textures.cape.is_some());
    }

    #[tokio::test]
    async fn fetches_texture_bytes_for_known_skin() {
        let api = MojangTestingApi::with_profiles();
        let bytes = api.fetch_texture_bytes(&HYDROFIN.skin_url).await.unwrap();
        assert_eq!(HYDROFIN.skin, bytes);
    }

    #[tokio::test]
    async fn unknown_texture_url_is_not_found() {
        let api = MojangTestingApi::with_profiles();
        assert!(api.fetch_texture_bytes("https://unknown").await.is_err());
    }
}
