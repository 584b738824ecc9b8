//! Single-flight session renewal.
//!
//! The coordinator is either `Idle` or `Refreshing` with a shared future.
//! Requests that hit an expired access token while a refresh is in flight
//! wait on that same future instead of issuing their own refresh, so a
//! refresh token is never presented twice for the same rotation.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::auth::SessionStore;
use crate::models::User;

/// Token and profile produced by one successful refresh
#[derive(Debug, Clone)]
pub(crate) struct Refreshed {
    pub access_token: String,
    pub user: User,
}

/// Refresh failures are shared between waiters, so they travel as text.
pub(crate) type RefreshOutcome = std::result::Result<Refreshed, String>;

pub(crate) type RefreshFuture = BoxFuture<'static, RefreshOutcome>;

#[derive(Debug)]
pub(crate) enum Renewal {
    /// The rejected token had already been replaced; use this one
    Current(String),
    Refreshed(RefreshOutcome),
}

enum RefreshState {
    Idle,
    Refreshing {
        generation: u64,
        refresh: Shared<RefreshFuture>,
    },
}

struct Inner {
    state: RefreshState,
    next_generation: u64,
}

pub(crate) struct RefreshCoordinator {
    inner: Mutex<Inner>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                next_generation: 0,
            }),
        }
    }

    #[cfg(test)]
    pub fn is_refreshing(&self) -> bool {
        matches!(self.inner.lock().state, RefreshState::Refreshing { .. })
    }

    /// Join the in-flight refresh, or start one with `start`.
    ///
    /// When `rejected` is given and the session already holds a different
    /// access token (a refresh finished after the rejected request was sent),
    /// that token is returned and no refresh is started.
    pub async fn renew<F>(&self, session: &SessionStore, rejected: Option<&str>, start: F) -> Renewal
    where
        F: FnOnce() -> RefreshFuture,
    {
        let (generation, refresh) = {
            let mut inner = self.inner.lock();
            let joined = match &inner.state {
                RefreshState::Refreshing { generation, refresh } => Some((*generation, refresh.clone())),
                RefreshState::Idle => None,
            };
            match joined {
                Some((generation, refresh)) => {
                    debug!(generation, "Joining in-flight session refresh");
                    (generation, refresh)
                }
                None => {
                    if let Some(rejected) = rejected {
                        if let Some(current) = session.access_token() {
                            if current != rejected {
                                return Renewal::Current(current);
                            }
                        }
                    }
                    let generation = inner.next_generation;
                    inner.next_generation += 1;
                    debug!(generation, "Starting session refresh");
                    let refresh = start().shared();
                    inner.state = RefreshState::Refreshing {
                        generation,
                        refresh: refresh.clone(),
                    };
                    (generation, refresh)
                }
            }
        };

        let outcome = refresh.await;

        let mut inner = self.inner.lock();
        if matches!(&inner.state, RefreshState::Refreshing { generation: g, .. } if *g == generation) {
            inner.state = RefreshState::Idle;
        }
        Renewal::Refreshed(outcome)
    }
}
