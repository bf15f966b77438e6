//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User account stored in Firestore.
///
/// `password_hash` and `refresh_token` never leave this type; API responses
/// go through [`PublicUser`], which has no such fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque account ID (also used as document ID)
    pub id: String,
    /// Unique handle, stored lowercase
    pub username: String,
    /// Unique email, stored lowercase
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Argon2 hash in PHC string format
    pub password_hash: String,
    /// Avatar image URL (required at registration)
    pub avatar_url: String,
    /// Cover image URL
    pub cover_image_url: Option<String>,
    /// Currently valid refresh token, None once logged out
    pub refresh_token: Option<String>,
    /// Video IDs in watch order
    pub watch_history: Vec<String>,
    /// When the account was created (ISO 8601)
    pub created_at: String,
}

/// Public projection of a user for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub watch_history: Vec<String>,
    pub created_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            watch_history: user.watch_history,
            created_at: user.created_at,
        }
    }
}

/// A user's channel page: public profile plus subscription-derived numbers.
///
/// Watch history is deliberately absent; a channel page is visible to any
/// authenticated viewer, not just its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribers_count: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub channels_subscribed_to_count: u64,
    pub is_subscribed: bool,
}
