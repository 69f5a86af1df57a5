//! GyanMitra tutor server

use gyanmitra::api::{create_router, AppState};
use gyanmitra::config::ServerConfig;
use gyanmitra::llm::ModelRegistry;
use gyanmitra::tutor::TutorResponder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::{
        predicate::{DefaultPredicate, NotForContentType, Predicate},
        CompressionLayer,
    },
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gyanmitra=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env();

    // Initialize generation services
    let registry = Arc::new(ModelRegistry::new(&config.llm));
    if registry.has_default_credential() {
        tracing::info!(model = %registry.model().id, "Default generation credential configured");
    } else {
        tracing::warn!(
            model = %registry.model().id,
            "No API key configured. Set GOOGLE_API_KEY or send apiKey with each request."
        );
    }

    let responder = Arc::new(TutorResponder::new(registry, config.generation));
    let state = AppState::new(responder, config.delivery);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Streamed answers must reach the client chunk by chunk
    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true)
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new("text/plain")));

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(delivery = %config.delivery, "GyanMitra server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
