//! Payflow HTTP server
//!
//! Loads configuration, connects to Postgres, runs migrations and serves the
//! checkout, account and webhook routes.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use payflow::adapters::http::{app_router, AppState, HttpSettings};
use payflow::adapters::{
    Argon2PasswordHasher, JwtSessionTokens, PostgresBillingRepository, PostgresUserRepository,
    StripeCheckoutAdapter,
};
use payflow::config::AppConfig;
use payflow::domain::billing::StripeWebhookVerifier;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_tracing(&config);

    // Database
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    // Adapters
    let users = Arc::new(PostgresUserRepository::new(pool.clone()));
    let billing = Arc::new(PostgresBillingRepository::new(pool));
    let checkout = Arc::new(StripeCheckoutAdapter::from_config(&config.payment));
    let verifier = Arc::new(
        StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.clone())
            .with_tolerance_secs(config.payment.webhook_tolerance_secs)
            .with_require_livemode(config.payment.require_livemode),
    );
    let hasher = Arc::new(Argon2PasswordHasher::new());
    let tokens = Arc::new(JwtSessionTokens::new(
        config.auth.jwt_secret.clone(),
        config.auth.session_lifetime(),
    ));

    if config.payment.is_test_mode() {
        tracing::info!("Stripe is in test mode");
    }

    let state = AppState::new(
        users,
        billing,
        checkout,
        verifier,
        hasher,
        tokens,
        HttpSettings::from_config(&config),
    );
    let app = app_router(state, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, public_url = %config.server.public_url, "Payflow listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
