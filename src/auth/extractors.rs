use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use time::OffsetDateTime;
use tower_cookies::Cookies;
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{repo::SessionStore, repo_types::SessionRecord, session::SessionKeys},
    error::AppError,
    state::AppState,
};

/// Request-scoped session handle: the presented cookie resolved against the session store.
pub struct Session {
    cookies: Cookies,
    keys: Arc<SessionKeys>,
    store: Arc<dyn SessionStore>,
    current: Option<SessionRecord>,
}

impl Session {
    pub fn current_user_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|s| s.user_id)
    }

    /// Binds a fresh session to `user_id`, replacing any session the request carried.
    pub async fn create(&mut self, user_id: Uuid) -> Result<String, AppError> {
        if let Some(old) = self.current.take() {
            self.store.delete(old.id).await?;
        }
        let expires_at = OffsetDateTime::now_utc() + self.keys.ttl;
        let record = self.store.insert(user_id, expires_at).await?;
        let token = self.keys.sign(&record)?;
        self.cookies.add(self.keys.cookie(token.clone()));
        debug!(session_id = %record.id, %user_id, "session created");
        self.current = Some(record);
        Ok(token)
    }

    pub async fn destroy(&mut self) -> Result<(), AppError> {
        let record = self.current.take().ok_or(AppError::Unauthorized)?;
        self.store.delete(record.id).await?;
        self.cookies.remove(self.keys.removal_cookie());
        debug!(session_id = %record.id, user_id = %record.user_id, "session destroyed");
        Ok(())
    }

    async fn resolve(
        cookies: &Cookies,
        keys: &SessionKeys,
        store: &dyn SessionStore,
    ) -> Result<Option<SessionRecord>, AppError> {
        let Some(cookie) = cookies.get(&keys.cookie_name) else {
            return Ok(None);
        };
        let claims = match keys.verify(cookie.value()) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "rejected session cookie");
                return Ok(None);
            }
        };
        Ok(store.find_active(claims.sid, OffsetDateTime::now_utc()).await?)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;
        let keys = state.session_keys.clone();
        let store = state.sessions.clone();
        let current = Self::resolve(&cookies, &keys, store.as_ref()).await?;
        Ok(Session {
            cookies,
            keys,
            store,
            current,
        })
    }
}

/// Rejects with 401 unless the request carries a live session; yields the bound user id.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        session
            .current_user_id()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}
