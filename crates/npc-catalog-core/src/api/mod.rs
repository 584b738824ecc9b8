//! REST API client module for the NPC catalogue backend.
//!
//! This module provides the `ApiClient` for communicating with the backend:
//! session endpoints (login, logout, refresh), users, images ("NPCs"),
//! notes, name generation and public note previews.
//!
//! Requests carry the current access token as a bearer credential. An
//! expired access token is renewed once through `/auth/refresh`, shared by
//! every request that hit the expiry at the same time.

mod auth;
pub mod client;
pub mod error;
mod names;
mod notes;
mod npcs;
pub mod query;
mod refresh;
mod users;

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind, Result};
pub use query::Resource;
