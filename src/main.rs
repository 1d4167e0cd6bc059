mod config;
mod db;
mod error;
mod forms;
mod middleware;
mod routes;
mod services;
mod state;
mod views;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::db::notes::PgNoteStore;
use crate::db::sessions::PgSessionStore;
use crate::db::users::PgUserStore;
use crate::services::password::PasswordHasher;
use crate::services::session::{SessionConfig, spawn_cleanup_task};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notebox=info,tower_http=warn")),
        )
        .init();

    let config = config::Config::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    let hasher = PasswordHasher::new(config.password_hash_cost).expect("invalid PASSWORD_HASH_COST");
    let hash_cost = hasher.cost();
    let session_config = SessionConfig { lifetime: config.session_lifetime, cookie_secure: config.cookie_secure };

    let state = state::AppState::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgNoteStore::new(pool.clone())),
        Arc::new(PgSessionStore::new(pool)),
        session_config,
        hasher,
    );

    let _cleanup = spawn_cleanup_task(state.sessions.clone(), config.session_cleanup_interval);

    let app = routes::app(state, &config.static_dir);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(
        port = config.port,
        cookie_secure = config.cookie_secure,
        hash_cost,
        "notebox listening"
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server failed");
}
