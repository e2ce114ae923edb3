//! Router assembly and startup

use std::sync::Arc;

use anyhow::Context;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::cors::cors_layer;
use crate::handlers::{
    config_handler, create_payment_intent_handler, health_handler, metrics_handler,
    webhook_handler, AppState,
};
use crate::notifier::kafka::{KafkaCredentials, KafkaRestNotifier};
use crate::stripe::{SignatureVerifier, StripeClient};

/// Build the HTTP router.
///
/// `/webhook` is only mounted when the state carries a notifier.
pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/config", get(config_handler))
        .route("/create-payment-intent", post(create_payment_intent_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    if state.notifier.is_some() {
        router = router.route("/webhook", post(webhook_handler));
    }

    router
        .route_layer(middleware::from_fn_with_state(state.clone(), record_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

async fn record_response(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string());

    let response = next.run(req).await;
    if let Some(route) = route {
        state
            .metrics
            .record_response(&route, response.status().as_u16());
    }
    response
}

/// Build the application state from configuration.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let provider = Arc::new(
        StripeClient::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
            config.stripe_timeout(),
        )
        .context("Failed to construct Stripe client")?,
    );

    if config.stripe_webhook_secret.is_empty() {
        warn!("STRIPE_WEBHOOK_SECRET is not set; every webhook will be rejected");
    }
    let verifier = SignatureVerifier::new(config.stripe_webhook_secret.clone())
        .with_tolerance(config.signature_tolerance());
    debug!(
        tolerance_secs = verifier.tolerance().as_secs(),
        "Webhook signature verification configured"
    );

    let mut state = AppState::new(config.stripe_publishable_key.clone(), provider, verifier)
        .with_currency(config.currency.clone());

    match &config.kafka_rest_url {
        Some(endpoint) => {
            let credentials = match (&config.kafka_username, &config.kafka_password) {
                (Some(username), Some(password)) => Some(KafkaCredentials {
                    username: username.clone(),
                    password: password.clone(),
                }),
                (None, None) => None,
                _ => {
                    warn!("Only one of KAFKA_USERNAME / KAFKA_PASSWORD is set; connecting without credentials");
                    None
                }
            };
            let notifier = KafkaRestNotifier::new(
                endpoint,
                config.customers_topic.clone(),
                credentials,
                config.publish_timeout(),
            )
            .context("Failed to construct Kafka notifier")?;
            info!(topic = %config.customers_topic, "Donation notifications enabled");
            state = state.with_notifier(Arc::new(notifier), config.publish_timeout());
        }
        None => {
            warn!("KAFKA_REST_URL is not set; /webhook is disabled");
        }
    }

    Ok(state)
}

/// Run the server until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate().context("Invalid configuration")?;
    let addr = config.listen_addr()?;

    let state = Arc::new(build_state(&config)?);
    let app = build_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(webhook_enabled = config.webhook_enabled(), "server running at {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
