// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::{Json, Router};
use clipstream_accounts::config::Config;
use clipstream_accounts::db::FirestoreDb;
use clipstream_accounts::routes::create_router;
use clipstream_accounts::services::{
    MediaClient, MediaService, ProfileService, SessionService, TokenService,
};
use clipstream_accounts::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Wire the full service stack over the given config and database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn build_app(config: Config, db: FirestoreDb) -> (Router, Arc<AppState>) {
    let tokens = TokenService::new(&config);
    let media_client = MediaClient::new(
        config.media_base_url.clone(),
        config.media_api_key.clone(),
        config.media_api_secret.clone(),
    );
    let media = MediaService::new(media_client, db.clone());
    let sessions = SessionService::new(db.clone(), tokens.clone(), media.clone());
    let profiles = ProfileService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        tokens,
        sessions,
        media,
        profiles,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    build_app(Config::default(), test_db_offline())
}

/// Create a test app against the Firestore emulator, pointed at the given
/// media provider base URL.
#[allow(dead_code)]
pub async fn create_emulator_app(media_base_url: &str) -> (Router, Arc<AppState>) {
    let config = Config {
        media_base_url: media_base_url.to_string(),
        ..Config::default()
    };
    build_app(config, test_db().await)
}

/// Issue a valid access token for an arbitrary user ID.
#[allow(dead_code)]
pub fn access_token_for(state: &AppState, user_id: &str) -> String {
    let user = clipstream_accounts::models::User {
        id: user_id.to_string(),
        username: "tokenbearer".to_string(),
        email: "tokenbearer@example.com".to_string(),
        full_name: "Token Bearer".to_string(),
        password_hash: "$argon2id$test".to_string(),
        avatar_url: "https://media.example.com/a.png".to_string(),
        cover_image_url: None,
        refresh_token: None,
        watch_history: Vec::new(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    state
        .tokens
        .issue_pair(&user)
        .expect("Token issuance should succeed")
        .access_token
}

/// What the stub media provider should answer to destroy calls.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub enum DestroyBehavior {
    Ok,
    NotFound,
    Fail,
}

/// Spawn a stub media provider on an ephemeral port; returns its base URL.
///
/// Uploads echo the submitted `public_id` back in a predictable asset URL
/// so later destroy calls can be traced to the same ID.
#[allow(dead_code)]
pub async fn spawn_media_provider(behavior: DestroyBehavior) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub provider");
    let addr = listener.local_addr().expect("Stub provider has no address");
    let base = format!("http://{addr}");

    let upload_base = base.clone();
    let app = Router::new()
        .route(
            "/v1/media/upload",
            axum::routing::post(move |mut multipart: axum::extract::Multipart| {
                let base = upload_base.clone();
                async move {
                    let mut public_id = "asset".to_string();
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        if field.name() == Some("public_id") {
                            public_id = field.text().await.unwrap();
                        }
                    }
                    Json(serde_json::json!({
                        "public_id": public_id,
                        "secure_url": format!("{base}/assets/{public_id}.png"),
                    }))
                }
            }),
        )
        .route(
            "/v1/media/destroy",
            axum::routing::post(move || async move {
                match behavior {
                    DestroyBehavior::Ok => {
                        (StatusCode::OK, Json(serde_json::json!({"result": "ok"})))
                    }
                    DestroyBehavior::NotFound => (
                        StatusCode::OK,
                        Json(serde_json::json!({"result": "not found"})),
                    ),
                    DestroyBehavior::Fail => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({"error": "storage backend down"})),
                    ),
                }
            }),
        );

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Stub provider died");
    });

    base
}

/// A base URL nothing listens on (bind, read the port, drop the socket).
#[allow(dead_code)]
pub async fn unreachable_media_provider() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway socket");
    let addr = listener.local_addr().expect("Throwaway socket has no address");
    drop(listener);
    format!("http://{addr}")
}

#[allow(dead_code)]
pub const MULTIPART_BOUNDARY: &str = "test-boundary-7db3a19c4e";

/// Minimal PNG-looking bytes for upload fields.
#[allow(dead_code)]
pub const FAKE_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x00,
];

#[allow(dead_code)]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

/// Hand-rolled multipart body: text fields then (name, filename, bytes) files.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body should be JSON")
}

/// Usernames unique enough for emulator runs, short enough for the 20-char
/// handle limit.
#[allow(dead_code)]
pub fn unique_username(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos()
        % 1_000_000_000;
    format!("{prefix}{nanos}")
}

/// Register a user through the API and return the response `data` object.
#[allow(dead_code)]
pub async fn register_user(
    app: &Router,
    username: &str,
    email: &str,
    password: &str,
) -> serde_json::Value {
    let body = multipart_body(
        &[
            ("username", username),
            ("email", email),
            ("fullName", "Test User"),
            ("password", password),
        ],
        &[("avatar", "avatar.png", FAKE_PNG)],
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/users/register")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::CREATED,
        "registration should succeed"
    );

    let json = body_json(response).await;
    json["data"].clone()
}
