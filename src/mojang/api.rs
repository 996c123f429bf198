//! The production [MojangHttpApi] implementation, talking to the real Mojang session server and
//! texture CDN through the shared [EgressClient](crate::egress::EgressClient).

use crate::egress::EgressClient;
use crate::error::EdgeError;
use crate::metrics::observe_mojang_request;
use crate::mojang::{
    Mojang, MultiProfileResponse, MultiTextureResponse, ProfileResponse, UsernameResponse,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::future::join_all;
use reqwest::StatusCode;
use std::time::Instant;
use uuid::Uuid;

const SESSION_SERVER: &str = "https://sessionserver.mojang.com";
const API_SERVER: &str = "https://api.mojang.com";

/// [MojangHttpApi] is a thin, stateless wrapper around [EgressClient] that speaks the three
/// upstream endpoints this service needs (`spec.md` §4.2).
pub struct MojangHttpApi {
    egress: EgressClient,
    signed: bool,
}

impl MojangHttpApi {
    /// Creates a new [MojangHttpApi]. `signed` controls whether profile fetches append
    /// `?unsigned=false`, matching `spec.md`'s `signed_profiles` configuration knob.
    pub fn new(egress: EgressClient, signed: bool) -> Self {
        Self { egress, signed }
    }

    async fn get(&self, request_type: &str, url: &str) -> Result<(StatusCode, Bytes), EdgeError> {
        let start = Instant::now();
        let result = self.egress.get(url).await;
        let status_label = match &result {
            Ok((status, _)) => status.as_u16().to_string(),
            Err(_) => "transport_error".to_string(),
        };
        observe_mojang_request(request_type, &status_label, start.elapsed());
        Ok(result?)
    }
}

#[async_trait]
impl Mojang for MojangHttpApi {
    async fn fetch_profile(&self, uuid: &Uuid) -> Result<ProfileResponse, EdgeError> {
        let mut url = format!(
            "{SESSION_SERVER}/session/minecraft/profile/{}",
            uuid.simple()
        );
        if self.signed {
            url.push_str("?unsigned=false");
        }
        let (status, body) = self.get("profile", &url).await?;
        if status != StatusCode::OK {
            return Err(EdgeError::from_status(status));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_uuid(&self, username: &str) -> Result<UsernameResponse, EdgeError> {
        let url = format!("{API_SERVER}/users/profiles/minecraft/{username}");
        let (status, body) = self.get("uuid", &url).await?;
        if status != StatusCode::OK {
            return Err(EdgeError::from_status(status));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_texture(&self, texture_id: &str) -> Result<String, EdgeError> {
        let url = format!("https://textures.minecraft.net/texture/{texture_id}");
        let bytes = self.fetch_texture_bytes(&url).await?;
        Ok(BASE64.encode(bytes))
    }

    async fn fetch_texture_bytes(&self, url: &str) -> Result<Bytes, EdgeError> {
        let (status, body) = self.get("texture", url).await?;
        if status != StatusCode::OK {
            return Err(EdgeError::from_status(status));
        }
        Ok(body)
    }

    async fn fetch_profiles(&self, uuids: &[Uuid]) -> Vec<MultiProfileResponse> {
        join_all(uuids.iter().map(|uuid| async move {
            MultiProfileResponse {
                id: *uuid,
                result: self.fetch_profile(uuid).await,
            }
        }))
        .await
    }

    async fn fetch_textures(&self, texture_ids: &[String]) -> Vec<MultiTextureResponse> {
        join_all(texture_ids.iter().map(|id| async move {
            MultiTextureResponse {
                id: id.clone(),
                result: self.fetch_texture(id).await,
            }
        }))
        .await
    }
}
