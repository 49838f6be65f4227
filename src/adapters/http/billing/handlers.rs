//! HTTP handlers for checkout, webhook and subscription endpoints.
//!
//! These handlers connect axum routes to application layer command/query handlers.

use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::adapters::http::state::AppState;
use crate::application::handlers::{
    CreateCheckoutSessionCommand, GetCheckoutSummaryQuery, HandleStripeWebhookCommand,
    ListSubscriptionsQuery,
};

use super::dto::{
    CheckoutSessionResponse, CheckoutSummaryResponse, CreateCheckoutSessionRequest,
    SubscriptionListResponse, SubscriptionResponse, SuccessQuery, WebhookAckResponse,
};

/// Stripe places `{CHECKOUT_SESSION_ID}` with the real id on redirect.
const SUCCESS_PATH: &str = "success?session_id={CHECKOUT_SESSION_ID}";
const CANCEL_PATH: &str = "cancel";

/// POST /webhook - Receive a Stripe event
///
/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let result = state
        .webhook_handler()
        .handle(HandleStripeWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(WebhookAckResponse {
            received: true,
            outcome: result.outcome.label().to_string(),
        }),
    ))
}

/// POST /create-checkout-session - Open a hosted checkout
pub async fn create_checkout_session(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreateCheckoutSessionCommand {
        user,
        email: request.email,
        product_name: request.product_name,
        amount: request.amount.value(),
        currency: request.currency,
        recurring: request.recurring,
        billing: request.billing.map(Into::into),
        success_url: state.settings.public_link(SUCCESS_PATH),
        cancel_url: state.settings.public_link(CANCEL_PATH),
    };

    let session = state.create_checkout_handler().handle(cmd).await?;

    Ok(Json(CheckoutSessionResponse::from(session)))
}

/// GET /success - Amount and currency of the completed checkout
pub async fn checkout_success(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<SuccessQuery>,
) -> impl IntoResponse {
    let session_id = query.session_id.filter(|s| !s.trim().is_empty());
    let summary = match &session_id {
        Some(id) => {
            state
                .checkout_summary_handler()
                .handle(GetCheckoutSummaryQuery {
                    session_id: id.clone(),
                })
                .await
        }
        None => Default::default(),
    };

    Json(CheckoutSummaryResponse::new(session_id, summary))
}

/// GET /cancel - Landing page after an abandoned checkout
pub async fn checkout_cancelled() -> &'static str {
    "Subscription cancelled."
}

/// GET /api/subscriptions - Subscriptions of the current user
pub async fn list_subscriptions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let subscriptions = state
        .list_subscriptions_handler()
        .handle(ListSubscriptionsQuery { user_id: user.id })
        .await?;

    Ok(Json(SubscriptionListResponse {
        subscriptions: subscriptions
            .into_iter()
            .map(SubscriptionResponse::from)
            .collect(),
    }))
}
