// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel-profile and watch-history read models.
//!
//! Firestore has no server-side joins, so both views are explicit queries
//! plus in-memory derivation. The derivation is kept in pure functions so
//! the join semantics (left-outer cardinality, order preservation, owner
//! collapse) are testable without a database.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{ChannelProfile, Subscription, User, Video, VideoOwner, WatchHistoryVideo};
use std::collections::HashMap;

/// Channel pages and resolved watch histories.
#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
}

impl ProfileService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// A channel's public page: profile fields plus subscriber counts and
    /// whether the viewer is among the subscribers.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
    ) -> Result<ChannelProfile, AppError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(AppError::validation("Username is required"));
        }

        let user = self
            .db
            .find_user_by_username(&username)
            .await?
            .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

        let subscribers = self.db.subscriptions_to_channel(&user.id).await?;
        let subscribed_to = self.db.subscriptions_by_subscriber(&user.id).await?;

        tracing::debug!(
            channel = %user.id,
            subscribers = subscribers.len(),
            subscribed_to = subscribed_to.len(),
            "Channel profile assembled"
        );

        Ok(build_channel_profile(
            user,
            &subscribers,
            &subscribed_to,
            viewer_id,
        ))
    }

    /// The user's watch history resolved into full video records with
    /// uploader profiles, in stored (watch) order.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchHistoryVideo>, AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if user.watch_history.is_empty() {
            return Ok(Vec::new());
        }

        let videos = self.db.get_videos_by_ids(&user.watch_history).await?;

        // One read per distinct uploader, not one per history entry
        let mut owner_ids: Vec<String> = Vec::new();
        for video in videos.iter().flatten() {
            if !owner_ids.contains(&video.owner_id) {
                owner_ids.push(video.owner_id.clone());
            }
        }
        let owners = owner_map(self.db.get_users_by_ids(&owner_ids).await?);

        Ok(join_watch_history(videos, &owners))
    }
}

/// Derive the channel view from its subscription edges.
///
/// `subscribers` are edges pointing at this channel; `subscribed_to` are
/// edges where the channel itself is the subscriber. No viewer means not
/// subscribed.
pub fn build_channel_profile(
    user: User,
    subscribers: &[Subscription],
    subscribed_to: &[Subscription],
    viewer_id: Option<&str>,
) -> ChannelProfile {
    let is_subscribed = viewer_id
        .map(|viewer| subscribers.iter().any(|edge| edge.subscriber_id == viewer))
        .unwrap_or(false);

    ChannelProfile {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
        email: user.email,
        avatar_url: user.avatar_url,
        cover_image_url: user.cover_image_url,
        subscribers_count: subscribers.len() as u64,
        channels_subscribed_to_count: subscribed_to.len() as u64,
        is_subscribed,
    }
}

/// Index uploader accounts by ID as minimal owner projections.
pub fn owner_map(users: Vec<Option<User>>) -> HashMap<String, VideoOwner> {
    users
        .into_iter()
        .flatten()
        .map(|user| {
            (
                user.id,
                VideoOwner {
                    full_name: user.full_name,
                    username: user.username,
                    avatar_url: user.avatar_url,
                },
            )
        })
        .collect()
}

/// Join fetched videos with their uploaders, preserving fetch order.
///
/// A history ID that resolved to no video drops its entry; a video whose
/// uploader is gone keeps its entry with no owner.
pub fn join_watch_history(
    videos: Vec<Option<Video>>,
    owners: &HashMap<String, VideoOwner>,
) -> Vec<WatchHistoryVideo> {
    videos
        .into_iter()
        .flatten()
        .map(|video| WatchHistoryVideo {
            owner: owners.get(&video.owner_id).cloned(),
            id: video.id,
            title: video.title,
            description: video.description,
            video_url: video.video_url,
            thumbnail_url: video.thumbnail_url,
            duration: video.duration,
            views: video.views,
            created_at: video.created_at,
        })
        .collect()
}
