use anyhow::Result;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::models::{TokenPair, User};

use super::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Snapshot returned by `SessionStore::current`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSession {
    pub user: User,
    pub access_token: String,
}

/// Outcome of startup initialization. There is no pending state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Authenticated(CurrentSession),
    Unauthenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

#[derive(Default)]
struct SessionData {
    tokens: Option<TokenPair>,
    user: Option<User>,
}

/// Holder of the token pair and the signed-in user's profile.
///
/// Every write replaces the pair as a unit and is mirrored to the backing
/// `TokenStore`. Locks are only held for synchronous reads and writes.
pub struct SessionStore {
    store: Box<dyn TokenStore>,
    data: RwLock<SessionData>,
}

impl SessionStore {
    /// Create a session store, loading any tokens persisted by an earlier run.
    ///
    /// A half-written pair (only one of the two keys present) is ignored.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self::from_boxed(Box::new(store))
    }

    pub fn from_boxed(store: Box<dyn TokenStore>) -> Self {
        let tokens = match Self::load_pair(store.as_ref()) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session, starting signed out");
                None
            }
        };
        debug!(has_tokens = tokens.is_some(), "Session loaded");

        Self {
            store,
            data: RwLock::new(SessionData { tokens, user: None }),
        }
    }

    fn load_pair(store: &dyn TokenStore) -> Result<Option<TokenPair>> {
        let access = store.get(ACCESS_TOKEN_KEY)?;
        let refresh = store.get(REFRESH_TOKEN_KEY)?;
        Ok(match (access, refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        })
    }

    fn persist(&self, tokens: &TokenPair) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        let access = self.store.remove(ACCESS_TOKEN_KEY);
        let refresh = self.store.remove(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }

    /// The signed-in user and access token, if both are known
    pub fn current(&self) -> Option<CurrentSession> {
        let data = self.data.read();
        match (&data.user, &data.tokens) {
            (Some(user), Some(tokens)) => Some(CurrentSession {
                user: user.clone(),
                access_token: tokens.access_token.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Whether a token pair is held, with or without a known profile
    pub fn has_tokens(&self) -> bool {
        self.data.read().tokens.is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.data.read().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.data.read().tokens.as_ref().map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.data.read().tokens.as_ref().map(|t| t.refresh_token.clone())
    }

    /// Install a freshly issued pair and profile (login).
    ///
    /// The in-memory session is updated even when persisting fails.
    pub fn replace(&self, tokens: TokenPair, user: User) -> Result<()> {
        {
            let mut data = self.data.write();
            data.tokens = Some(tokens.clone());
            data.user = Some(user);
        }
        self.persist(&tokens)
    }

    /// Swap in a refreshed access token, keeping the refresh token it was
    /// obtained with.
    ///
    /// Returns `Ok(false)` without touching anything when the held refresh
    /// token is no longer `used_refresh` (the session was replaced or cleared
    /// while the refresh was in flight).
    pub fn rotate_access(&self, used_refresh: &str, access_token: String, user: User) -> Result<bool> {
        let tokens = {
            let mut data = self.data.write();
            match data.tokens {
                Some(ref current) if current.refresh_token == used_refresh => {}
                _ => return Ok(false),
            }
            let tokens = TokenPair::new(access_token, used_refresh);
            data.tokens = Some(tokens.clone());
            data.user = Some(user);
            tokens
        };
        self.persist(&tokens)?;
        Ok(true)
    }

    /// Forget the session and its persisted tokens.
    ///
    /// Memory is cleared first; a storage error is returned afterwards.
    pub fn clear(&self) -> Result<()> {
        {
            let mut data = self.data.write();
            data.tokens = None;
            data.user = None;
        }
        self.erase()
    }

    /// Clear only if the held refresh token is still `used_refresh`.
    pub fn clear_if_refresh(&self, used_refresh: &str) -> Result<bool> {
        {
            let mut data = self.data.write();
            match data.tokens {
                Some(ref current) if current.refresh_token != used_refresh => return Ok(false),
                _ => {}
            }
            data.tokens = None;
            data.user = None;
        }
        self.erase()?;
        Ok(true)
    }
}
