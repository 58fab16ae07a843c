//! Gemini Talks - chat backend for the Gemini generative-language API
//!
//! Keeps one in-memory conversation, forwards text and image prompts to
//! Gemini, and publishes every conversation snapshot over HTTP and SSE.

mod api;
mod config;
mod coordinator;
mod llm;
mod runtime;
mod state_machine;
mod store;

use api::{create_router, AppState};
use config::AppConfig;
use coordinator::ResponseCoordinator;
use runtime::ChatSession;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for outstanding replies
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_talks=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    // Generation API
    let service = llm::build_service(&config.llm)?;
    tracing::info!(
        text_model = %config.llm.text_model,
        vision_model = %config.llm.vision_model,
        timeout_secs = config.coordinator.request_timeout.as_secs(),
        "Generation API configured"
    );

    // Session
    let coordinator = ResponseCoordinator::new(service, config.coordinator);
    let state = AppState::new(ChatSession::new(coordinator, config.dispatch_policy));
    let session = state.session.clone();

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Gemini Talks server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Give in-flight replies a chance to land before exiting
    if tokio::time::timeout(SHUTDOWN_GRACE, session.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            pending = session.snapshot().awaiting_reply().len(),
            "Shutting down with replies outstanding"
        );
    }

    tracing::info!("Gemini Talks server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
