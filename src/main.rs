use std::sync::Arc;

use tokengate::{
    AppState, MemoryUserStore, UserStoreState,
    config::{AppConfig, Env},
    create_router,
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the user store and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tokengate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(
        env = ?config.env,
        token_ttl_secs = config.security.token_ttl.as_secs(),
        public_paths = ?config.security.public_paths,
        "application starting"
    );

    // 3. User store
    let store = load_user_store(&config);
    if store.is_empty() {
        tracing::warn!("user store is empty; every login will be rejected");
    }
    let store = Arc::new(store) as UserStoreState;

    // 4. State, router, server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(config, store));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind listener. Check BIND_ADDR.");
    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}

/// Loads user records from `USERS_FILE`, or seeds demo users when running locally.
fn load_user_store(config: &AppConfig) -> MemoryUserStore {
    match (&config.users_file, &config.env) {
        (Some(path), _) => MemoryUserStore::from_file(path)
            .unwrap_or_else(|e| panic!("FATAL: cannot load USERS_FILE: {e}")),
        (None, Env::Local) => {
            tracing::info!("seeding demo users: user, moderator, admin");
            MemoryUserStore::with_demo_users(&config.demo_password)
                .unwrap_or_else(|e| panic!("FATAL: cannot seed demo users: {e}"))
        }
        (None, Env::Production) => MemoryUserStore::default(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
