//! Session and credential persistence.
//!
//! This module provides:
//! - `SessionStore`: the process-wide holder of the token pair and the
//!   authenticated user's profile
//! - `TokenStore`: synchronous key/value persistence for the two tokens,
//!   with file, OS keychain and in-memory backends
//!
//! Tokens live under the fixed keys `access_token` and `refresh_token` and
//! survive restarts until logout or a failed refresh clears them.

pub mod credentials;
pub mod session;
pub mod token_store;

pub use credentials::KeyringTokenStore;
pub use session::{AuthState, CurrentSession, SessionStore};
pub use token_store::{
    FileTokenStore, MemoryTokenStore, TokenStorage, TokenStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
