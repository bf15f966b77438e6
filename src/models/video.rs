// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video catalog records and the watch-history projection built from them.
//!
//! The `videos` collection is written by the platform's video service; this
//! service only reads it to resolve watch histories.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored video record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Video ID (also used as document ID)
    pub id: String,
    /// Account ID of the uploading channel
    pub owner_id: String,
    pub title: String,
    pub description: String,
    /// Playback URL in the media store
    pub video_url: String,
    /// Thumbnail URL in the media store
    pub thumbnail_url: String,
    /// Duration in seconds
    pub duration: f64,
    pub views: u64,
    pub is_published: bool,
    /// When the video was uploaded (ISO 8601)
    pub created_at: String,
}

/// Minimal public profile of a video's uploader, embedded in history entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VideoOwner {
    pub full_name: String,
    pub username: String,
    pub avatar_url: String,
}

/// One entry of a resolved watch history: the video plus its uploader.
///
/// `owner` is None when the uploader's account no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WatchHistoryVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    pub owner: Option<VideoOwner>,
    pub created_at: String,
}
