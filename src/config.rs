use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres URL. `None` selects the in-memory backend.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to touch process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

        let session = SessionConfig {
            secret: lookup("SESSION_SECRET")
                .filter(|v| !v.is_empty())
                .context("SESSION_SECRET must be set")?,
            issuer: lookup("SESSION_ISSUER").unwrap_or_else(|| "cookbook".into()),
            audience: lookup("SESSION_AUDIENCE").unwrap_or_else(|| "cookbook-users".into()),
            ttl_minutes: parse_or(&lookup, "SESSION_TTL_MINUTES", 60 * 24 * 7)?,
            cookie_name: lookup("SESSION_COOKIE_NAME").unwrap_or_else(|| "cookbook_session".into()),
            cookie_secure: parse_or(&lookup, "SESSION_COOKIE_SECURE", false)?,
            purge_interval_secs: parse_or(&lookup, "SESSION_PURGE_INTERVAL_SECS", 60 * 60)?,
        };
        anyhow::ensure!(session.ttl_minutes > 0, "SESSION_TTL_MINUTES must be positive");
        anyhow::ensure!(
            session.purge_interval_secs > 0,
            "SESSION_PURGE_INTERVAL_SECS must be positive"
        );

        Ok(Self {
            database_url,
            max_connections,
            session,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
