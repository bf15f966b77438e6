// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle and session management.
//!
//! Registration, credential login, refresh-token rotation, logout, password
//! change, and profile updates. Identity pre-checks happen here; the store
//! enforces only document-ID uniqueness, so username/email checks are
//! read-before-write with a known race window.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{PublicUser, User};
use crate::services::media::{MediaService, TempFile};
use crate::services::password;
use crate::services::tokens::{TokenPair, TokenService};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Single wire message for every refresh failure mode. The cause goes to
/// logs; distinguishing it on the wire would tell an attacker which guess
/// was close.
const REFRESH_REJECTION: &str = "Refresh token is invalid or expired";

/// Registration fields, extracted from the multipart form.
#[derive(Debug, Validate)]
pub struct RegistrationForm {
    #[validate(custom(function = validate_username_format))]
    pub username: String,
    #[validate(custom(function = validate_email_format))]
    pub email: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "Full name must be between 2 and 50 characters"
    ))]
    pub full_name: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl RegistrationForm {
    /// Surrounding whitespace is never meaningful in any field.
    fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }
}

/// Partial profile update. Absent fields stay unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    #[validate(length(
        min = 2,
        max = 50,
        message = "Full name must be between 2 and 50 characters"
    ))]
    pub full_name: Option<String>,
    #[serde(default)]
    #[validate(custom(function = validate_email_format))]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// Trim without dropping blank values; a provided-but-blank field should
    /// fail validation, not silently mean "unchanged".
    fn trimmed(self) -> Self {
        Self {
            full_name: self.full_name.map(|v| v.trim().to_string()),
            email: self.email.map(|v| v.trim().to_string()),
        }
    }
}

/// Handle rule: 3 to 20 characters, ASCII letters, digits, underscore.
fn validate_username_format(username: &str) -> Result<(), ValidationError> {
    let chars_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if chars_ok && (3..=20).contains(&username.len()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_format");
        err.message =
            Some("Username must be 3 to 20 characters of letters, numbers, or underscores".into());
        Err(err)
    }
}

/// Address rule: no whitespace, exactly one '@', non-empty local part, and
/// a dot inside the domain that is not its first or last character.
fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !email.chars().any(char::is_whitespace)
                && !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("email_format");
        err.message = Some("Invalid email format".into());
        Err(err)
    }
}

/// Lowercase identifiers, treating blank input as absent.
fn normalize_identifier(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn require_field(value: Option<String>, message: &'static str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::validation(message)),
    }
}

/// Account and session operations.
#[derive(Clone)]
pub struct SessionService {
    db: FirestoreDb,
    tokens: TokenService,
    media: MediaService,
}

impl SessionService {
    pub fn new(db: FirestoreDb, tokens: TokenService, media: MediaService) -> Self {
        Self { db, tokens, media }
    }

    /// Create an account.
    ///
    /// Field validation, then a single existence query over both
    /// identifiers, then media uploads, then the store insert. Identifiers
    /// are stored lowercase so later lookups are exact matches.
    pub async fn register(
        &self,
        form: RegistrationForm,
        avatar: Option<TempFile>,
        cover: Option<TempFile>,
    ) -> Result<PublicUser, AppError> {
        let form = form.trimmed();
        form.validate()?;

        let username = form.username.to_lowercase();
        let email = form.email.to_lowercase();

        if self
            .db
            .find_user_by_username_or_email(Some(&username), Some(&email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar_asset = self
            .media
            .upload(avatar.as_ref())
            .await?
            .ok_or_else(|| AppError::validation("Avatar file is required"))?;
        let cover_asset = self.media.upload(cover.as_ref()).await?;

        let password_hash = password::hash_password(form.password).await?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            full_name: form.full_name,
            password_hash,
            avatar_url: avatar_asset.secure_url,
            cover_image_url: cover_asset.map(|asset| asset.secure_url),
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.db.insert_user(&user).await?;

        // Read back what was actually stored; its absence now is a server
        // fault, not a client one.
        let stored = self.db.get_user(&user.id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "User {} missing immediately after registration",
                user.id
            ))
        })?;

        tracing::info!(user_id = %stored.id, username = %stored.username, "User registered");

        Ok(PublicUser::from(stored))
    }

    /// Verify credentials and open a session.
    ///
    /// Either identifier works; an unknown identity is NotFound while a bad
    /// password is an auth failure. The refresh token is persisted so it can
    /// be matched (and rotated) later.
    pub async fn login(
        &self,
        username: Option<String>,
        email: Option<String>,
        password_input: Option<String>,
    ) -> Result<(PublicUser, TokenPair), AppError> {
        let username = normalize_identifier(username);
        let email = normalize_identifier(email);
        if username.is_none() && email.is_none() {
            return Err(AppError::validation("Username or email is required"));
        }

        let password_input = require_field(password_input, "Password is required")?;

        let user = self
            .db
            .find_user_by_username_or_email(username.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !password::verify_password(password_input, user.password_hash.clone()).await? {
            return Err(AppError::Auth("Invalid user credentials".to_string()));
        }

        let pair = self.tokens.issue_pair(&user)?;
        self.db
            .set_refresh_token(&user.id, Some(&pair.refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok((PublicUser::from(user), pair))
    }

    /// Invalidate the live refresh token.
    ///
    /// Idempotent: an already-cleared token or a vanished account is still a
    /// successful logout.
    pub async fn logout(&self, user_id: &str) -> Result<(), AppError> {
        if self.db.get_user(user_id).await?.is_none() {
            return Ok(());
        }
        self.db.set_refresh_token(user_id, None).await?;

        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a fresh pair, rotating the stored token.
    ///
    /// The presented token must verify against the refresh secret and be
    /// identical (constant-time) to the stored one, so each issued token is
    /// usable at most once.
    pub async fn refresh_session(&self, incoming: Option<&str>) -> Result<TokenPair, AppError> {
        let incoming = match incoming {
            Some(token) if !token.is_empty() => token,
            _ => {
                tracing::warn!(reason = "missing token", "Refresh rejected");
                return Err(AppError::Auth(REFRESH_REJECTION.to_string()));
            }
        };

        let claims = match self.tokens.verify_refresh(incoming) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(reason = %e, "Refresh rejected");
                return Err(AppError::Auth(REFRESH_REJECTION.to_string()));
            }
        };

        let user = match self.db.get_user(&claims.sub).await? {
            Some(user) => user,
            None => {
                tracing::warn!(reason = "unknown subject", "Refresh rejected");
                return Err(AppError::Auth(REFRESH_REJECTION.to_string()));
            }
        };

        let stored = user.refresh_token.as_deref().unwrap_or("");
        let token_matches: bool = incoming.as_bytes().ct_eq(stored.as_bytes()).into();
        if !token_matches {
            tracing::warn!(user_id = %user.id, reason = "token mismatch", "Refresh rejected");
            return Err(AppError::Auth(REFRESH_REJECTION.to_string()));
        }

        // Rotation: the presented token is spent the moment the new pair is
        // stored. Compare-then-rewrite is not transactional; see the module
        // docs for the accepted window.
        let pair = self.tokens.issue_pair(&user)?;
        self.db
            .set_refresh_token(&user.id, Some(&pair.refresh_token))
            .await?;

        Ok(pair)
    }

    /// Change the password after verifying the old one.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: Option<String>,
        new_password: Option<String>,
        confirm_password: Option<String>,
    ) -> Result<(), AppError> {
        let old_password = require_field(old_password, "Old password is required")?;
        let new_password = require_field(new_password, "New password is required")?;
        let confirm_password = require_field(confirm_password, "Confirm password is required")?;

        if new_password != confirm_password {
            return Err(AppError::validation(
                "New password and confirm password do not match",
            ));
        }
        if new_password.chars().count() < 6 {
            return Err(AppError::validation(
                "Password must be at least 6 characters",
            ));
        }

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !password::verify_password(old_password, user.password_hash.clone()).await? {
            return Err(AppError::validation("Invalid old password"));
        }

        let new_hash = password::hash_password(new_password).await?;
        self.db.set_password_hash(&user.id, &new_hash).await?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Apply a partial profile update and return the refreshed projection.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<PublicUser, AppError> {
        let update = update.trimmed();
        if update.full_name.is_none() && update.email.is_none() {
            return Err(AppError::validation("At least one field must be provided"));
        }
        update.validate()?;

        let mut user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if let Some(full_name) = update.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = update.email {
            let email = email.to_lowercase();
            if email != user.email {
                // Same read-before-write window as registration
                if self
                    .db
                    .find_user_by_username_or_email(None, Some(&email))
                    .await?
                    .is_some()
                {
                    return Err(AppError::Conflict("Email is already in use".to_string()));
                }
                user.email = email;
            }
        }

        self.db.upsert_user(&user).await?;

        Ok(PublicUser::from(user))
    }

    /// The authenticated caller's own public record.
    pub async fn current_user(&self, user_id: &str) -> Result<PublicUser, AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;
        Ok(PublicUser::from(user))
    }
}
