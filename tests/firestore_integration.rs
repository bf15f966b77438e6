// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Each test works on uniquely-named
//! documents so runs do not interfere with each other.

use clipstream_accounts::error::AppError;
use clipstream_accounts::models::{Subscription, User, Video};

mod common;
use common::{test_db, unique_username};

/// Helper to create a basic test user.
fn test_user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: "Test User".to_string(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
        avatar_url: format!("https://media.example.com/{username}.png"),
        cover_image_url: None,
        refresh_token: None,
        watch_history: Vec::new(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn test_video(id: &str, owner_id: &str) -> Video {
    Video {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        title: format!("Video {id}"),
        description: "An upload".to_string(),
        video_url: format!("https://media.example.com/{id}.mp4"),
        thumbnail_url: format!("https://media.example.com/{id}.jpg"),
        duration: 12.5,
        views: 3,
        is_published: true,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn edge(subscriber_id: &str, channel_id: &str) -> Subscription {
    Subscription {
        subscriber_id: subscriber_id.to_string(),
        channel_id: channel_id.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_insert_and_get_user() {
    require_emulator!();

    let db = test_db().await;
    let username = unique_username("crud");
    let id = format!("u-{username}");

    assert!(db.get_user(&id).await.unwrap().is_none());

    let mut user = test_user(&id, &username);
    user.watch_history = vec!["v-1".to_string(), "v-2".to_string()];
    db.insert_user(&user).await.unwrap();

    let stored = db.get_user(&id).await.unwrap().expect("user should exist");
    assert_eq!(stored.username, username);
    assert_eq!(stored.email, format!("{username}@example.com"));
    assert_eq!(stored.watch_history, vec!["v-1", "v-2"]);
    assert!(stored.cover_image_url.is_none());
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_insert_existing_id_is_a_conflict() {
    require_emulator!();

    let db = test_db().await;
    let username = unique_username("dup");
    let id = format!("u-{username}");

    db.insert_user(&test_user(&id, &username)).await.unwrap();
    let err = db
        .insert_user(&test_user(&id, &username))
        .await
        .expect_err("second insert must fail");

    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn test_find_user_by_either_identifier() {
    require_emulator!();

    let db = test_db().await;
    let username = unique_username("find");
    let id = format!("u-{username}");
    let email = format!("{username}@example.com");
    db.insert_user(&test_user(&id, &username)).await.unwrap();

    let by_username = db
        .find_user_by_username_or_email(Some(&username), None)
        .await
        .unwrap();
    assert_eq!(by_username.map(|u| u.id), Some(id.clone()));

    let by_email = db
        .find_user_by_username_or_email(None, Some(&email))
        .await
        .unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(id.clone()));

    // One matching identifier is enough
    let mixed = db
        .find_user_by_username_or_email(Some("no-such-user"), Some(&email))
        .await
        .unwrap();
    assert_eq!(mixed.map(|u| u.id), Some(id));

    let miss = db
        .find_user_by_username_or_email(Some("no-such-user"), Some("nobody@example.com"))
        .await
        .unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn test_find_user_by_username() {
    require_emulator!();

    let db = test_db().await;
    let username = unique_username("handle");
    let id = format!("u-{username}");
    db.insert_user(&test_user(&id, &username)).await.unwrap();

    let found = db.find_user_by_username(&username).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(id));

    assert!(db
        .find_user_by_username("definitely-not-registered")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_partial_field_writes_leave_the_rest_alone() {
    require_emulator!();

    let db = test_db().await;
    let username = unique_username("patch");
    let id = format!("u-{username}");
    db.insert_user(&test_user(&id, &username)).await.unwrap();

    db.set_refresh_token(&id, Some("refresh-jwt")).await.unwrap();
    db.set_password_hash(&id, "$argon2id$new").await.unwrap();
    db.set_avatar_url(&id, "https://media.example.com/new-avatar.png")
        .await
        .unwrap();
    db.set_cover_image_url(&id, "https://media.example.com/new-cover.png")
        .await
        .unwrap();
    db.set_watch_history(&id, &["v-9".to_string()]).await.unwrap();

    let stored = db.get_user(&id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-jwt"));
    assert_eq!(stored.password_hash, "$argon2id$new");
    assert_eq!(stored.avatar_url, "https://media.example.com/new-avatar.png");
    assert_eq!(
        stored.cover_image_url.as_deref(),
        Some("https://media.example.com/new-cover.png")
    );
    assert_eq!(stored.watch_history, vec!["v-9"]);
    // Untouched fields survive every partial write
    assert_eq!(stored.username, username);
    assert_eq!(stored.email, format!("{username}@example.com"));

    // Logout clears the token without touching anything else
    db.set_refresh_token(&id, None).await.unwrap();
    let stored = db.get_user(&id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
    assert_eq!(stored.password_hash, "$argon2id$new");
}

#[tokio::test]
async fn test_get_users_by_ids_keeps_order_and_holes() {
    require_emulator!();

    let db = test_db().await;
    let a = unique_username("batcha");
    let b = unique_username("batchb");
    let id_a = format!("u-{a}");
    let id_b = format!("u-{b}");
    db.insert_user(&test_user(&id_a, &a)).await.unwrap();
    db.insert_user(&test_user(&id_b, &b)).await.unwrap();

    let ids = vec![id_b.clone(), "u-missing".to_string(), id_a.clone()];
    let users = db.get_users_by_ids(&ids).await.unwrap();

    assert_eq!(users.len(), 3);
    assert_eq!(users[0].as_ref().map(|u| u.id.clone()), Some(id_b));
    assert!(users[1].is_none());
    assert_eq!(users[2].as_ref().map(|u| u.id.clone()), Some(id_a));

    let empty = db.get_users_by_ids(&[]).await.unwrap();
    assert!(empty.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// SUBSCRIPTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_subscription_edges_query_both_directions() {
    require_emulator!();

    let db = test_db().await;
    let channel = format!("ch-{}", unique_username("sub"));
    let viewer_1 = format!("{channel}-v1");
    let viewer_2 = format!("{channel}-v2");

    db.upsert_subscription(&edge(&viewer_1, &channel)).await.unwrap();
    db.upsert_subscription(&edge(&viewer_2, &channel)).await.unwrap();
    db.upsert_subscription(&edge(&channel, &viewer_1)).await.unwrap();

    let subscribers = db.subscriptions_to_channel(&channel).await.unwrap();
    assert_eq!(subscribers.len(), 2);
    assert!(subscribers.iter().all(|s| s.channel_id == channel));

    let subscribed_to = db.subscriptions_by_subscriber(&channel).await.unwrap();
    assert_eq!(subscribed_to.len(), 1);
    assert_eq!(subscribed_to[0].channel_id, viewer_1);
}

#[tokio::test]
async fn test_subscription_upsert_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let channel = format!("ch-{}", unique_username("idem"));
    let viewer = format!("{channel}-viewer");

    // Same edge twice lands on the same composite document ID
    db.upsert_subscription(&edge(&viewer, &channel)).await.unwrap();
    db.upsert_subscription(&edge(&viewer, &channel)).await.unwrap();

    let subscribers = db.subscriptions_to_channel(&channel).await.unwrap();
    assert_eq!(subscribers.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// VIDEO TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_video_roundtrip() {
    require_emulator!();

    let db = test_db().await;
    let id = format!("v-{}", unique_username("vid"));

    assert!(db.get_video(&id).await.unwrap().is_none());

    db.upsert_video(&test_video(&id, "owner-1")).await.unwrap();

    let stored = db.get_video(&id).await.unwrap().expect("video should exist");
    assert_eq!(stored.owner_id, "owner-1");
    assert_eq!(stored.duration, 12.5);
    assert!(stored.is_published);
}

#[tokio::test]
async fn test_get_videos_by_ids_keeps_order_and_holes() {
    require_emulator!();

    let db = test_db().await;
    let base = unique_username("vbatch");
    let id_1 = format!("v-{base}-1");
    let id_2 = format!("v-{base}-2");
    db.upsert_video(&test_video(&id_1, "owner-1")).await.unwrap();
    db.upsert_video(&test_video(&id_2, "owner-1")).await.unwrap();

    let ids = vec![id_2.clone(), "v-gone".to_string(), id_1.clone()];
    let videos = db.get_videos_by_ids(&ids).await.unwrap();

    assert_eq!(videos.len(), 3);
    assert_eq!(videos[0].as_ref().map(|v| v.id.clone()), Some(id_2));
    assert!(videos[1].is_none());
    assert_eq!(videos[2].as_ref().map(|v| v.id.clone()), Some(id_1));
}
