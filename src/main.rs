use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toy_exchange::auth::UserRegistry;
use toy_exchange::config::AppConfig;
use toy_exchange::services::matching::Matcher;
use toy_exchange::store::{PgStore, Store};
use toy_exchange::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toy_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing::info!("Starting toy-exchange v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.environment);

    let pg = PgStore::connect(&config.database_url).await?;
    pg.migrate().await?;
    tracing::info!("Database connected and migrated");
    let store: Arc<dyn Store> = Arc::new(pg);

    let matcher = Arc::new(Matcher::new(store.clone()));
    matcher.recover_from_store().await?;

    let users = UserRegistry::new(store.clone());
    users.recover_from_store().await?;

    let state = Arc::new(AppState { config, users, matcher });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/debug/headers", get(api::handlers::public::debug_headers))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
