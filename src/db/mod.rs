//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Subscriber-to-channel edges, written by the subscription service
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    /// Video catalog, written by the video service
    pub const VIDEOS: &str = "videos";
}
