// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media storage integration for avatar and cover images.
//!
//! Handles:
//! - Staging multipart uploads as temp files that clean up after themselves
//! - Signed upload/destroy calls against the media storage provider
//! - Image replacement with best-effort deletion of the previous asset

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::PublicUser;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// A staged upload on local disk.
///
/// The file is removed when this value drops, so staged bytes never outlive
/// the request that produced them, whichever way it ends.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    original_filename: String,
}

impl TempFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove staged upload"
                );
            }
        }
    }
}

/// Write an uploaded field to the staging directory.
pub async fn stage_upload(
    upload_dir: &str,
    original_filename: &str,
    data: &[u8],
) -> Result<TempFile, AppError> {
    // Keep only the final component of the client-supplied name
    let safe_name = Path::new(original_filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.bin");

    let path = Path::new(upload_dir).join(format!("{}-{}", Uuid::new_v4().simple(), safe_name));
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {e}")))?;

    Ok(TempFile {
        path,
        original_filename: safe_name.to_string(),
    })
}

/// An asset stored by the media provider.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaAsset {
    pub public_id: String,
    pub secure_url: String,
}

/// Provider acknowledgment for a destroy call.
#[derive(Debug, Clone, Deserialize)]
pub struct DestroyResponse {
    pub result: String,
}

/// What happened to the previous asset during a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DeletionOutcome {
    Deleted,
    NotFound,
    Failed(String),
}

/// Which user image field a replacement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    Cover,
}

impl ImageKind {
    fn missing_file_message(self) -> &'static str {
        match self {
            ImageKind::Avatar => "Avatar file is required",
            ImageKind::Cover => "Cover image file is required",
        }
    }
}

/// Media storage provider client.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl MediaClient {
    /// Create a new client with provider credentials.
    pub fn new(base_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            api_secret,
        }
    }

    /// Upload a staged file, returning the stored asset.
    pub async fn upload(&self, file: &TempFile) -> Result<MediaAsset, AppError> {
        let data = tokio::fs::read(file.path()).await.map_err(|e| {
            AppError::ExternalService(format!("Failed to read staged upload: {}", e))
        })?;

        let public_id = Uuid::new_v4().simple().to_string();
        let timestamp = unix_now()?;
        let signature = self.sign(&format!("public_id={}&timestamp={}", public_id, timestamp))?;

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file.original_filename().to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("public_id", public_id)
            .text("timestamp", timestamp.to_string())
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let url = format!("{}/v1/media/upload", self.base_url);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Upload request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Ask the provider to destroy an asset by public ID.
    pub async fn destroy(&self, public_id: &str) -> Result<DestroyResponse, AppError> {
        let timestamp = unix_now()?;
        let signature = self.sign(&format!("public_id={}&timestamp={}", public_id, timestamp))?;

        let body = serde_json::json!({
            "public_id": public_id,
            "timestamp": timestamp,
            "api_key": self.api_key,
            "signature": signature,
        });

        let url = format!("{}/v1/media/destroy", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Destroy request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Sign a request payload with the API secret.
    fn sign(&self, payload: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("JSON parse error: {}", e)))
    }
}

/// Derive the provider public ID from a stored asset URL.
///
/// Final path segment, query/fragment stripped, percent-decoded, extension
/// stripped. Returns None when nothing identifiable remains.
pub fn derive_public_id(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(segment).ok()?;
    let stem = decoded.split('.').next().unwrap_or("");
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Image upload, replacement, and deletion against the media provider.
#[derive(Clone)]
pub struct MediaService {
    client: MediaClient,
    db: FirestoreDb,
}

impl MediaService {
    pub fn new(client: MediaClient, db: FirestoreDb) -> Self {
        Self { client, db }
    }

    /// Upload a staged file if one was provided.
    ///
    /// `None` in means `Ok(None)` out; callers decide whether a missing file
    /// is acceptable. Provider failures are errors, never silent Nones.
    pub async fn upload(&self, file: Option<&TempFile>) -> Result<Option<MediaAsset>, AppError> {
        match file {
            None => Ok(None),
            Some(file) => self.client.upload(file).await.map(Some),
        }
    }

    /// Replace a user's avatar or cover image.
    ///
    /// The new asset is uploaded and the user record updated before the old
    /// asset is touched; its deletion is best-effort and reported in the
    /// returned outcome rather than failing the replacement.
    pub async fn replace_image(
        &self,
        user_id: &str,
        file: Option<TempFile>,
        kind: ImageKind,
    ) -> Result<(PublicUser, Option<DeletionOutcome>), AppError> {
        let file = file.ok_or_else(|| AppError::validation(kind.missing_file_message()))?;

        let asset = self.client.upload(&file).await?;

        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        let previous_url = match kind {
            ImageKind::Avatar => {
                let previous = Some(user.avatar_url.clone());
                self.db.set_avatar_url(user_id, &asset.secure_url).await?;
                user.avatar_url = asset.secure_url.clone();
                previous
            }
            ImageKind::Cover => {
                let previous = user.cover_image_url.clone();
                self.db
                    .set_cover_image_url(user_id, &asset.secure_url)
                    .await?;
                user.cover_image_url = Some(asset.secure_url.clone());
                previous
            }
        };

        let outcome = match previous_url.filter(|url| !url.is_empty()) {
            None => None,
            Some(url) => {
                let outcome = match self.delete(&url).await {
                    Ok(outcome) => outcome,
                    Err(e) => DeletionOutcome::Failed(e.to_string()),
                };
                if !matches!(outcome, DeletionOutcome::Deleted) {
                    tracing::warn!(
                        user_id,
                        url = %url,
                        ?outcome,
                        "Previous media asset was not removed"
                    );
                }
                Some(outcome)
            }
        };

        Ok((PublicUser::from(user), outcome))
    }

    /// Delete a stored asset by its URL.
    ///
    /// Provider trouble is folded into the outcome; only a URL that carries
    /// no identifier is a caller error.
    pub async fn delete(&self, url: &str) -> Result<DeletionOutcome, AppError> {
        let public_id = derive_public_id(url).ok_or_else(|| {
            AppError::validation("No media identifier could be derived from the URL")
        })?;

        match self.client.destroy(&public_id).await {
            Ok(ack) => Ok(match ack.result.as_str() {
                "ok" => DeletionOutcome::Deleted,
                "not found" => DeletionOutcome::NotFound,
                other => DeletionOutcome::Failed(format!("Unexpected provider result: {}", other)),
            }),
            Err(e) => Ok(DeletionOutcome::Failed(e.to_string())),
        }
    }
}

fn unix_now() -> Result<u64, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs())
}
