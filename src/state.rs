use crate::config::Config;
use crate::engine::store::SessionStore;
use axum::extract::FromRef;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Revoked-token set checked by the auth middleware. Constructed once at startup
/// and injected through `AppState` rather than living in a global.
#[derive(Clone, Default)]
pub struct TokenBlocklist {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl TokenBlocklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, token: &str) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string());
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub sessions: SessionStore,
    pub blocklist: TokenBlocklist,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config,
            sessions: SessionStore::new(),
            blocklist: TokenBlocklist::new(),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
