//! labpay HTTP Server

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labpay_server::config::AppConfig;
use labpay_server::router;
use labpay_server::state::build_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let state = build_state(&config)?;

    if state.automation_secret_set {
        tracing::info!("✓ automation forwarding configured with shared secret");
    } else {
        tracing::warn!("⚠ AUTOMATION_WEBHOOK_SECRET not set - forwarding without auth header");
    }

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("labpay server running on http://{}", config.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                          - Health check");
    tracing::info!("  POST /api/checkout                    - Create checkout session");
    tracing::info!("  POST /api/connect/onboard             - Payee onboarding link");
    tracing::info!("  GET  /api/connect/status/{{account_id}} - Connected account status");
    tracing::info!("  POST /webhook/stripe                  - Processor webhook intake");

    axum::serve(listener, app).await?;

    Ok(())
}
