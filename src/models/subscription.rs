// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription edge records (subscriber follows channel).

use serde::{Deserialize, Serialize};

/// A subscription edge stored in Firestore.
///
/// Both sides are account IDs from the `users` collection. The edge is
/// written by the platform's subscription service; this service reads it to
/// derive channel statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Account that subscribed
    pub subscriber_id: String,
    /// Account being subscribed to
    pub channel_id: String,
    /// When the subscription was created (ISO 8601)
    pub created_at: String,
}

impl Subscription {
    /// Document ID: combine both sides so an edge can exist at most once.
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.subscriber_id, self.channel_id)
    }
}
