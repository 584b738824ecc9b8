//! Client library for the NPC catalogue backend.
//!
//! - `api`: the authenticated `ApiClient` and its resource operations
//! - `auth`: the `SessionStore` and token persistence backends
//! - `models`: users, images, notes, filters and pagination
//! - `config`: base URL, timeout and storage settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ErrorKind};
pub use auth::{AuthState, CurrentSession, SessionStore};
pub use config::Config;
