// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ClipStream Accounts API Server
//!
//! Serves user registration, login, session refresh, profile maintenance,
//! and channel views for the ClipStream video platform.

use clipstream_accounts::{
    config::Config,
    db::FirestoreDb,
    services::{MediaClient, MediaService, ProfileService, SessionService, TokenService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting ClipStream Accounts API");

    // Upload staging directory must exist before the first multipart request
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload staging directory");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Token signing and verification
    let tokens = TokenService::new(&config);

    // Media provider client (avatar and cover storage)
    let media_client = MediaClient::new(
        config.media_base_url.clone(),
        config.media_api_key.clone(),
        config.media_api_secret.clone(),
    );
    let media = MediaService::new(media_client, db.clone());
    tracing::info!(base_url = %config.media_base_url, "Media provider client initialized");

    // Account/session operations and channel read models
    let sessions = SessionService::new(db.clone(), tokens.clone(), media.clone());
    let profiles = ProfileService::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        tokens,
        sessions,
        media,
        profiles,
    });

    // Build router
    let app = clipstream_accounts::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clipstream_accounts=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
