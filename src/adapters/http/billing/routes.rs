//! Axum router configuration for billing endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::auth_middleware;
use crate::adapters::http::state::AppState;

use super::handlers::{
    checkout_cancelled, checkout_success, create_checkout_session, list_subscriptions,
    receive_webhook,
};

/// Create the billing router.
///
/// # Routes
///
/// ## Public
/// - `POST /webhook` - Stripe events (verified by signature, not session)
/// - `GET /cancel` - Abandoned checkout landing page
///
/// ## Logged in
/// - `POST /create-checkout-session` - Open a hosted checkout
/// - `GET /success` - Summary of the completed checkout
/// - `GET /api/subscriptions` - Subscriptions of the current user
pub fn billing_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/success", get(checkout_success))
        .route("/api/subscriptions", get(list_subscriptions))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/cancel", get(checkout_cancelled))
        .merge(protected)
}
