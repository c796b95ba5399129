use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookfair_system::{config::Config, controllers, services::cleanup::CleanupService, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BookFair API");

    let app_state = AppState::new(config.clone())
        .await
        .expect("Failed to initialize application state");
    info!("Database and Redis connected");

    // --- Start background tasks ---

    // Reap stale pending reservations every 5 minutes
    if config.features.enable_cleanup {
        let cleanup = CleanupService::new(app_state.clone());
        tokio::task::spawn(async move {
            loop {
                cleanup.run_cleanup().await;
                tokio::time::sleep(Duration::from_secs(300)).await;
            }
        });
    }

    // --- Start the web server ---

    let app = Router::new()
        .route("/", get(|| async { "BookFair API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes(&app_state))
        .with_state(app_state.clone())
        // The portals are browser apps on another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    if state.db.health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    }
}
