// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod media;
pub mod password;
pub mod profile;
pub mod session;
pub mod tokens;

pub use media::{MediaClient, MediaService};
pub use profile::ProfileService;
pub use session::SessionService;
pub use tokens::TokenService;
