// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account, session, and channel endpoints under `/api/v1/users`.

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE};
use crate::models::{ChannelProfile, PublicUser, WatchHistoryVideo};
use crate::services::media::{stage_upload, DeletionOutcome, ImageKind, TempFile};
use crate::services::session::{ProfileUpdate, RegistrationForm};
use crate::services::tokens::TokenPair;
use crate::AppState;

/// Cookie that carries the refresh token for browser clients.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

const AVATAR_FIELD: &str = "avatar";
const COVER_FIELD: &str = "coverImage";

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh-token", post(refresh_token))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/change-password", post(change_password))
        .route("/api/v1/users/current-user", get(current_user))
        .route("/api/v1/users/change-avatar", patch(change_avatar))
        .route("/api/v1/users/change-cover", patch(change_cover))
        .route(
            "/api/v1/users/change-account-details",
            patch(change_account_details),
        )
        .route("/api/v1/users/channel/{username}", get(channel_profile))
        .route("/api/v1/users/history", get(watch_history))
}

// ─── Response Envelope ───────────────────────────────────────

/// Uniform success envelope; `statusCode` mirrors the HTTP status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
}

fn envelope<T: Serialize>(
    status: StatusCode,
    data: T,
    message: &str,
) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            status_code: status.as_u16(),
            data,
            message: message.to_string(),
        }),
    )
}

/// Login payload: the user plus both tokens for non-cookie clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Image replacement payload; `deletionOutcome` is present only when a
/// previous asset existed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImageUpdateData {
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_outcome: Option<DeletionOutcome>,
}

// ─── Request Bodies ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::validation(rejection.body_text())
}

fn bad_form(rejection: MultipartRejection) -> AppError {
    AppError::validation(rejection.body_text())
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::validation(format!("Invalid multipart form data: {err}"))
}

// ─── Session Cookies ─────────────────────────────────────────

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
}

/// Cookie lifetimes track the token lifetimes.
fn with_session_cookies(jar: CookieJar, state: &AppState, pair: &TokenPair) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        state.tokens.access_ttl_secs(),
        state.config.cookie_secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        state.tokens.refresh_ttl_secs(),
        state.config.cookie_secure,
    ))
}

fn clear_session_cookies(jar: CookieJar, state: &AppState) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE, state.config.cookie_secure))
        .add(removal_cookie(
            REFRESH_TOKEN_COOKIE,
            state.config.cookie_secure,
        ))
}

// ─── Multipart Helpers ───────────────────────────────────────

/// Stage one uploaded file field to the local spool directory.
async fn stage_field(
    upload_dir: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<TempFile> {
    let original = field.file_name().unwrap_or("upload.bin").to_string();
    let data = field.bytes().await.map_err(bad_multipart)?;
    stage_upload(upload_dir, &original, &data).await
}

/// Pull registration text fields and staged files out of the form.
///
/// Missing text fields become empty strings so each one fails its own
/// validation rule by name instead of a blanket parse error.
async fn read_registration_form(
    upload_dir: &str,
    mut multipart: Multipart,
) -> Result<(RegistrationForm, Option<TempFile>, Option<TempFile>)> {
    let mut username = String::new();
    let mut email = String::new();
    let mut full_name = String::new();
    let mut password = String::new();
    let mut avatar = None;
    let mut cover = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "username" => username = field.text().await.map_err(bad_multipart)?,
            "email" => email = field.text().await.map_err(bad_multipart)?,
            "fullName" => full_name = field.text().await.map_err(bad_multipart)?,
            "password" => password = field.text().await.map_err(bad_multipart)?,
            AVATAR_FIELD => avatar = Some(stage_field(upload_dir, field).await?),
            COVER_FIELD => cover = Some(stage_field(upload_dir, field).await?),
            _ => {}
        }
    }

    Ok((
        RegistrationForm {
            username,
            email,
            full_name,
            password,
        },
        avatar,
        cover,
    ))
}

/// Stage the named file field, ignoring everything else in the form.
async fn read_single_file(
    upload_dir: &str,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Option<TempFile>> {
    let mut staged = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() == Some(field_name) {
            staged = Some(stage_field(upload_dir, field).await?);
        }
    }
    Ok(staged)
}

// ─── Account Lifecycle ───────────────────────────────────────

/// POST /api/v1/users/register - create an account from a multipart form.
async fn register(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>)> {
    let multipart = multipart.map_err(bad_form)?;
    let (form, avatar, cover) =
        read_registration_form(&state.config.upload_dir, multipart).await?;
    let user = state.sessions.register(form, avatar, cover).await?;
    Ok(envelope(
        StatusCode::CREATED,
        user,
        "User registered successfully.",
    ))
}

/// POST /api/v1/users/login - verify credentials and open a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<LoginData>>))> {
    let Json(req) = body.map_err(bad_json)?;
    let (user, pair) = state
        .sessions
        .login(req.username, req.email, req.password)
        .await?;

    let jar = with_session_cookies(jar, &state, &pair);
    Ok((
        jar,
        envelope(
            StatusCode::OK,
            LoginData {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully.",
        ),
    ))
}

/// POST /api/v1/users/refresh-token - rotate the refresh token.
///
/// The token may arrive in the cookie or the JSON body; the cookie wins.
/// The body is read leniently so a cookie-only client with an empty body
/// still refreshes.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<TokenPair>>))> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            serde_json::from_slice::<RefreshRequest>(&body)
                .ok()
                .and_then(|req| req.refresh_token)
        });

    let pair = state.sessions.refresh_session(presented.as_deref()).await?;

    let jar = with_session_cookies(jar, &state, &pair);
    Ok((jar, envelope(StatusCode::OK, pair, "Access token refreshed.")))
}

/// POST /api/v1/users/logout - invalidate the session and drop cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, (StatusCode, Json<ApiResponse<serde_json::Value>>))> {
    state.sessions.logout(&user.id).await?;

    let jar = clear_session_cookies(jar, &state);
    Ok((
        jar,
        envelope(
            StatusCode::OK,
            serde_json::json!({}),
            "User logged out successfully.",
        ),
    ))
}

// ─── Account Maintenance ─────────────────────────────────────

/// POST /api/v1/users/change-password - rotate the password.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    let Json(req) = body.map_err(bad_json)?;
    state
        .sessions
        .change_password(&user.id, req.old_password, req.new_password, req.confirm_password)
        .await?;
    Ok(envelope(
        StatusCode::OK,
        serde_json::json!({}),
        "Password changed successfully.",
    ))
}

/// GET /api/v1/users/current-user - the caller's own account.
async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>)> {
    let user = state.sessions.current_user(&user.id).await?;
    Ok(envelope(StatusCode::OK, user, "User fetched successfully."))
}

/// PATCH /api/v1/users/change-avatar - replace the avatar image.
async fn change_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ImageUpdateData>>)> {
    let multipart = multipart.map_err(bad_form)?;
    let file = read_single_file(&state.config.upload_dir, multipart, AVATAR_FIELD).await?;
    let (user, deletion_outcome) = state
        .media
        .replace_image(&user.id, file, ImageKind::Avatar)
        .await?;
    Ok(envelope(
        StatusCode::OK,
        ImageUpdateData {
            user,
            deletion_outcome,
        },
        "Avatar updated successfully.",
    ))
}

/// PATCH /api/v1/users/change-cover - replace the cover image.
async fn change_cover(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ImageUpdateData>>)> {
    let multipart = multipart.map_err(bad_form)?;
    let file = read_single_file(&state.config.upload_dir, multipart, COVER_FIELD).await?;
    let (user, deletion_outcome) = state
        .media
        .replace_image(&user.id, file, ImageKind::Cover)
        .await?;
    Ok(envelope(
        StatusCode::OK,
        ImageUpdateData {
            user,
            deletion_outcome,
        },
        "Cover image updated successfully.",
    ))
}

/// PATCH /api/v1/users/change-account-details - partial profile update.
async fn change_account_details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>)> {
    let Json(update) = body.map_err(bad_json)?;
    let user = state.sessions.update_profile(&user.id, update).await?;
    Ok(envelope(
        StatusCode::OK,
        user,
        "Account details updated successfully.",
    ))
}

// ─── Channel Views ───────────────────────────────────────────

/// GET /api/v1/users/channel/{username} - a channel's public profile.
async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<ChannelProfile>>)> {
    let profile = state
        .profiles
        .channel_profile(&username, Some(&user.id))
        .await?;
    Ok(envelope(
        StatusCode::OK,
        profile,
        "Channel profile fetched successfully.",
    ))
}

/// GET /api/v1/users/history - the caller's resolved watch history.
async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<WatchHistoryVideo>>>)> {
    let history = state.profiles.watch_history(&user.id).await?;
    Ok(envelope(
        StatusCode::OK,
        history,
        "Watch history fetched successfully.",
    ))
}
