use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use http::{Method, header};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod state;
mod storage;

mod models {
    pub mod department;
    pub mod requirement;
    pub mod session;
    pub mod staff;
    pub mod submission;
}

mod repositories {
    pub mod department;
    pub mod requirement;
    pub mod staff;
    pub mod submission;
}

mod services {
    pub mod audit;
    pub mod sessions;
    pub mod uploads;
}

mod handlers {
    pub mod documents;
    pub mod staff;
}

mod middleware_layer {
    pub mod session;
}

mod validation {
    pub mod upload;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
        ])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            "x-session-token".parse().unwrap(),
        ])
        .max_age(Duration::from_secs(86400));

    let public_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .use_headers()
            .finish()
            .unwrap(),
    );

    let public_routes = Router::new()
        .route("/api/staff/validate", post(handlers::staff::validate_staff))
        .route(
            "/api/staff/select-department",
            post(handlers::staff::select_department),
        )
        .route("/api/staff/session", delete(handlers::staff::logout))
        .layer(tower_governor::GovernorLayer::new(public_governor_conf))
        .with_state(state.clone());

    let session_routes = Router::new()
        .route(
            "/api/staff/requirements",
            get(handlers::staff::list_requirements),
        )
        .route("/api/documents/upload", post(handlers::documents::upload))
        .route(
            "/api/documents/upload/multiple",
            post(handlers::documents::upload_multiple),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::session::require_session,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .layer(cors);

    let sweep_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("🧹 Running scheduled sweep of expired sessions...");
            let evicted = sweep_state.sessions.sweep();
            tracing::info!(
                "✅ Session sweep completed: {} evicted, {} remaining",
                evicted,
                sweep_state.sessions.len()
            );
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background session sweep started (runs every hour)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
