use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    password,
    repo::{PgSessionStore, PgUserStore, SessionStore, UserStore},
    session::SessionKeys,
};
use crate::config::AppConfig;
use crate::db;
use crate::memory::MemoryStore;
use crate::recipes::repo::{PgRecipeStore, RecipeStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub recipes: Arc<dyn RecipeStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub session_keys: Arc<SessionKeys>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        password::prime_dummy_hash();

        match config.database_url.clone() {
            Some(url) => {
                let db = db::connect(&url, config.max_connections).await?;
                info!("using postgres backend");
                Ok(Self::from_parts(
                    config,
                    Arc::new(PgUserStore::new(db.clone())),
                    Arc::new(PgRecipeStore::new(db.clone())),
                    Arc::new(PgSessionStore::new(db)),
                ))
            }
            None => {
                warn!("DATABASE_URL not set; data lives in memory and is lost on restart");
                Ok(Self::with_memory(config, Arc::new(MemoryStore::new())))
            }
        }
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        recipes: Arc<dyn RecipeStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let session_keys = Arc::new(SessionKeys::from_config(&config.session));
        Self {
            config: Arc::new(config),
            users,
            recipes,
            sessions,
            session_keys,
        }
    }

    pub fn with_memory(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        Self::from_parts(config, store.clone(), store.clone(), store)
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_memory(Self::test_config(), Arc::new(MemoryStore::new()))
    }

    #[cfg(test)]
    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: None,
            max_connections: 1,
            session: crate::config::SessionConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                cookie_name: "cookbook_session".into(),
                cookie_secure: false,
                purge_interval_secs: 60,
            },
        }
    }
}
