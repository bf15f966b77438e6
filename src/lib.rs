// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! ClipStream Accounts: user accounts for the ClipStream video platform
//!
//! This crate provides the backend API for registration, credential login,
//! session token rotation, profile and image maintenance, and channel
//! profile / watch history views.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{MediaService, ProfileService, SessionService, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub tokens: TokenService,
    pub sessions: SessionService,
    pub media: MediaService,
    pub profiles: ProfileService,
}
