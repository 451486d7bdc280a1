use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::StoreError;

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    Ok(db)
}

/// Maps uniqueness, foreign-key and check violations to `StoreError::Conflict`.
/// The statement that raised them was rolled back by Postgres, so nothing was written.
pub fn map_constraint(e: sqlx::Error, conflict_msg: &str) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation()
            || db_err.is_foreign_key_violation()
            || db_err.is_check_violation()
        {
            tracing::debug!(
                constraint = db_err.constraint().unwrap_or("-"),
                "constraint violation"
            );
            return StoreError::Conflict(conflict_msg.to_string());
        }
    }
    StoreError::from(e)
}
