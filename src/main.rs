use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use idcard_pdf::app_state::AppState;
use idcard_pdf::config::AppConfig;
use idcard_pdf::routes;
use idcard_pdf::services::{
    credential::{CredentialCache, HttpTokenProvider},
    fallback::{FallbackCascade, RecognitionTier},
    ocr::RecognitionClient,
    proxy::ProxyClient,
    renderer::DocumentRenderer,
    synthetic::RemoteSyntheticClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    let page = config.page_config().expect("Invalid page geometry");

    tracing::info!("Initializing idcard-pdf server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    // Provider credentials and direct recognition client
    tracing::info!(token_url = %config.ocr_token_url, "Initializing recognition provider client");
    let token_provider = HttpTokenProvider::new(
        &config.ocr_token_url,
        &config.ocr_client_id,
        &config.ocr_client_secret,
        config.token_timeout(),
    )
    .expect("Failed to initialize token client");
    let credentials = Arc::new(CredentialCache::new(
        Arc::new(token_provider),
        config.token_safety_margin(),
    ));
    let recognizer = Arc::new(
        RecognitionClient::new(
            &config.ocr_recognition_url,
            credentials,
            config.recognition_timeout(),
        )
        .expect("Failed to initialize recognition client"),
    );

    // Fallback cascade: provider (direct or via proxy), remote synthetic, local synthetic
    let mut tiers: Vec<Arc<dyn RecognitionTier>> = Vec::new();
    match &config.ocr_proxy_url {
        Some(proxy_url) => {
            tracing::info!(proxy_url = %proxy_url, "Routing recognition through proxy");
            let proxy = ProxyClient::new(proxy_url, config.recognition_timeout())
                .expect("Failed to initialize proxy client");
            tiers.push(Arc::new(proxy));
        }
        None => tiers.push(recognizer.clone()),
    }
    let synthetic_url = config.synthetic_endpoint();
    tracing::info!(synthetic_url = %synthetic_url, "Remote synthetic fallback enabled");
    let remote = RemoteSyntheticClient::new(&synthetic_url, config.synthetic_timeout())
        .expect("Failed to initialize synthetic client");
    tiers.push(Arc::new(remote));
    let cascade = FallbackCascade::new(tiers);
    tracing::info!(tiers = cascade.tier_count(), "Recognition cascade ready");

    let renderer =
        DocumentRenderer::new(page, config.max_image_bytes).with_title(&config.document_title);

    // Create shared application state
    let state = AppState::new(recognizer, cascade, renderer);

    // Build API routes
    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(config.max_request_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_request_bytes));

    tracing::info!("Starting idcard-pdf on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
