use std::time::Duration;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod memory;
mod recipes;
mod state;
#[cfg(test)]
mod test_support;

use crate::{auth::session::spawn_purge_task, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "cookbook=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    spawn_purge_task(
        app_state.sessions.clone(),
        Duration::from_secs(app_state.config.session.purge_interval_secs),
    );

    app::serve(app::build_app(app_state)).await
}
