// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account storage, credential and session fields)
//! - Subscriptions (channel follow edges, read for channel stats)
//! - Videos (catalog reads for watch-history resolution)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Subscription, User, Video};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Partial-update payloads. Writing through `fields()` touches only the
/// named field, so concurrent profile edits are not clobbered by session
/// bookkeeping.
#[derive(Serialize, Deserialize)]
struct RefreshTokenPatch {
    refresh_token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PasswordHashPatch {
    password_hash: String,
}

#[derive(Serialize, Deserialize)]
struct AvatarPatch {
    avatar_url: String,
}

#[derive(Serialize, Deserialize)]
struct CoverImagePatch {
    cover_image_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WatchHistoryPatch {
    watch_history: Vec<String>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by account ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user matching either identifier. Both are stored lowercase;
    /// callers normalize before querying. Returns None when neither
    /// identifier is given.
    pub async fn find_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }

        let username = username.map(|s| s.to_string());
        let email = email.map(|s| s.to_string());

        let mut matches: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                let mut clauses = Vec::new();
                if let Some(u) = &username {
                    clauses.push(q.field("username").eq(u.clone()));
                }
                if let Some(e) = &email {
                    clauses.push(q.field("email").eq(e.clone()));
                }
                q.for_any(clauses)
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.pop())
    }

    /// Find a user by exact (lowercased) username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let username = username.to_string();
        let mut matches: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("username").eq(username.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.pop())
    }

    /// Create a user. Fails if a document with the same ID already exists;
    /// uniqueness of username/email is checked by the caller beforehand.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| match e {
                firestore::errors::FirestoreError::DataConflictError(_) => {
                    AppError::Conflict("User with email or username already exists".to_string())
                }
                other => AppError::Database(other.to_string()),
            })?;
        Ok(())
    }

    /// Rewrite a full user document.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store or clear the live refresh token. `None` writes an explicit null.
    pub async fn set_refresh_token(
        &self,
        user_id: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        let patch = RefreshTokenPatch {
            refresh_token: refresh_token.map(|s| s.to_string()),
        };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(RefreshTokenPatch::{refresh_token}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Replace the stored password hash.
    pub async fn set_password_hash(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let patch = PasswordHashPatch {
            password_hash: password_hash.to_string(),
        };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(PasswordHashPatch::{password_hash}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Point the avatar field at a new media asset.
    pub async fn set_avatar_url(&self, user_id: &str, avatar_url: &str) -> Result<(), AppError> {
        let patch = AvatarPatch {
            avatar_url: avatar_url.to_string(),
        };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(AvatarPatch::{avatar_url}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Point the cover image field at a new media asset.
    pub async fn set_cover_image_url(
        &self,
        user_id: &str,
        cover_image_url: &str,
    ) -> Result<(), AppError> {
        let patch = CoverImagePatch {
            cover_image_url: Some(cover_image_url.to_string()),
        };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(CoverImagePatch::{cover_image_url}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite a user's watch history (ordered video IDs).
    pub async fn set_watch_history(
        &self,
        user_id: &str,
        video_ids: &[String],
    ) -> Result<(), AppError> {
        let patch = WatchHistoryPatch {
            watch_history: video_ids.to_vec(),
        };
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(WatchHistoryPatch::{watch_history}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch several users by ID, preserving input order.
    ///
    /// Uses concurrent point reads with a limit to avoid overloading
    /// Firestore. Missing IDs yield None at their position.
    pub async fn get_users_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<Option<User>>, AppError> {
        let client = self.get_client()?;

        stream::iter(user_ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::USERS)
                    .obj()
                    .one(&id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect()
    }

    // ─── Subscription Operations ─────────────────────────────────

    /// All edges where the given user is the channel (their subscribers).
    pub async fn subscriptions_to_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        let channel_id = channel_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.field("channel_id").eq(channel_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All edges where the given user is the subscriber (channels they follow).
    pub async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        let subscriber_id = subscriber_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.field("subscriber_id").eq(subscriber_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a subscription edge (idempotent per subscriber/channel pair).
    pub async fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(subscription.doc_id())
            .object(subscription)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Video Operations ────────────────────────────────────────

    /// Get a video by ID.
    pub async fn get_video(&self, video_id: &str) -> Result<Option<Video>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(video_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch several videos by ID, preserving input order.
    ///
    /// Missing IDs yield None at their position so the caller can apply
    /// its own skip semantics without losing ordering.
    pub async fn get_videos_by_ids(
        &self,
        video_ids: &[String],
    ) -> Result<Vec<Option<Video>>, AppError> {
        let client = self.get_client()?;

        stream::iter(video_ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::VIDEOS)
                    .obj()
                    .one(&id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Video>, AppError>>>()
            .await
            .into_iter()
            .collect()
    }

    /// Store a video record.
    pub async fn upsert_video(&self, video: &Video) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::VIDEOS)
            .document_id(&video.id)
            .object(video)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
