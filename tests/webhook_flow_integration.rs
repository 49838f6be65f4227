//! Integration tests for the webhook reconciliation flow.
//!
//! Every delivery goes through the full router: signature check, dedup,
//! reconciliation and the in-memory store, exactly as Stripe would hit it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use payflow::adapters::auth::{Argon2PasswordHasher, MockSessionTokens};
use payflow::adapters::http::{app_router, AppState, HttpSettings};
use payflow::adapters::memory::InMemoryStore;
use payflow::adapters::stripe::MockCheckoutProvider;
use payflow::config::ServerConfig;
use payflow::domain::account::User;
use payflow::domain::billing::{StripeWebhookVerifier, SubscriptionStatus};
use payflow::ports::UserRepository;

const SECRET: &str = "whsec_integration";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    store: InMemoryStore,
}

impl TestApp {
    async fn new() -> Self {
        let store = InMemoryStore::new();
        store
            .create(&User::new("user@example.com", "$argon2id$unused"))
            .await
            .unwrap();

        let state = AppState::new(
            store.users(),
            store.billing(),
            Arc::new(MockCheckoutProvider::new()),
            Arc::new(StripeWebhookVerifier::new(SecretString::new(SECRET.to_string()))),
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(MockSessionTokens::new()),
            HttpSettings::default(),
        );

        Self {
            router: app_router(state, &ServerConfig::default()),
            store,
        }
    }

    /// Delivers a signed event and returns status plus JSON body.
    async fn deliver(&self, event: &Value) -> (StatusCode, Value) {
        let payload = event.to_string();
        let header = sign(payload.as_bytes(), chrono::Utc::now().timestamp());
        self.post_webhook(payload, Some(header)).await
    }

    async fn post_webhook(&self, payload: String, signature: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri("/webhook");
        if let Some(signature) = signature {
            builder = builder.header("Stripe-Signature", signature);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(payload)).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn status_of(&self, subscription_id: &str) -> Option<SubscriptionStatus> {
        self.store
            .subscription(subscription_id)
            .await
            .map(|s| s.status)
    }

    async fn user(&self) -> User {
        self.store.user_by_email("user@example.com").await.unwrap()
    }
}

fn sign(payload: &[u8], timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn event(id: &str, event_type: &str, created: i64, object: Value) -> Value {
    json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "created": created,
        "livemode": false,
        "data": { "object": object }
    })
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn checkout_completed(id: &str, created: i64) -> Value {
    event(
        id,
        "checkout.session.completed",
        created,
        json!({
            "id": "cs_1",
            "customer": "cus_1",
            "customer_email": "user@example.com",
            "subscription": "sub_1",
            "payment_status": "paid"
        }),
    )
}

fn subscription_event(id: &str, event_type: &str, created: i64, status: &str) -> Value {
    event(
        id,
        event_type,
        created,
        json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": status,
            "current_period_start": created,
            "current_period_end": created + 30 * 86_400,
            "cancel_at_period_end": false
        }),
    )
}

fn invoice_event(id: &str, event_type: &str, created: i64) -> Value {
    event(
        id,
        event_type,
        created,
        json!({
            "id": "in_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "amount_paid": 1999,
            "amount_due": 1999,
            "currency": "usd"
        }),
    )
}

// =============================================================================
// Checkout Completion
// =============================================================================

#[tokio::test]
async fn checkout_activates_subscription_and_grants_access() {
    let app = TestApp::new().await;

    let (status, body) = app.deliver(&checkout_completed("evt_1", now())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");
    assert_eq!(app.status_of("sub_1").await, Some(SubscriptionStatus::Active));

    let user = app.user().await;
    assert!(user.has_access);
    assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_1"));
}

#[tokio::test]
async fn redelivered_checkout_is_duplicate() {
    let app = TestApp::new().await;
    let evt = checkout_completed("evt_1", now());

    app.deliver(&evt).await;
    let (status, body) = app.deliver(&evt).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");
    assert_eq!(app.store.processed_event_count().await, 1);
}

#[tokio::test]
async fn checkout_for_unknown_email_is_dropped_with_200() {
    let app = TestApp::new().await;
    let evt = event(
        "evt_stranger",
        "checkout.session.completed",
        now(),
        json!({
            "id": "cs_2",
            "customer": "cus_9",
            "customer_email": "stranger@example.com",
            "subscription": "sub_9",
            "payment_status": "paid"
        }),
    );

    let (status, body) = app.deliver(&evt).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unknown_customer");
    assert!(app.status_of("sub_9").await.is_none());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn checkout_then_deletion_cancels_and_revokes_access() {
    let app = TestApp::new().await;
    let t = now();

    app.deliver(&checkout_completed("evt_1", t)).await;
    let (status, _) = app
        .deliver(&subscription_event(
            "evt_2",
            "customer.subscription.deleted",
            t + 1,
            "canceled",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.status_of("sub_1").await, Some(SubscriptionStatus::Cancelled));
    assert!(!app.user().await.has_access);
}

#[tokio::test]
async fn update_without_prior_checkout_creates_nothing() {
    let app = TestApp::new().await;

    let (status, body) = app
        .deliver(&subscription_event(
            "evt_1",
            "customer.subscription.updated",
            now(),
            "active",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unknown_subscription");
    assert!(app.status_of("sub_1").await.is_none());
}

#[tokio::test]
async fn failed_payment_flags_user_and_success_clears_it() {
    let app = TestApp::new().await;
    let t = now();
    app.deliver(&checkout_completed("evt_1", t)).await;

    let (_, body) = app
        .deliver(&invoice_event("evt_2", "invoice.payment_failed", t + 1))
        .await;
    assert_eq!(body["outcome"], "applied");
    assert_eq!(app.status_of("sub_1").await, Some(SubscriptionStatus::PastDue));
    assert!(app.user().await.payment_alert);

    let (_, again) = app
        .deliver(&invoice_event("evt_2", "invoice.payment_failed", t + 1))
        .await;
    assert_eq!(again["outcome"], "duplicate");

    app.deliver(&invoice_event("evt_3", "invoice.payment_succeeded", t + 2))
        .await;
    let user = app.user().await;
    assert!(!user.payment_alert);

    let subscription = app.store.subscription("sub_1").await.unwrap();
    let payment = subscription.last_payment.unwrap();
    assert_eq!(payment.amount, 1999);
    assert_eq!(payment.currency, "usd");
}

#[tokio::test]
async fn older_update_after_newer_one_is_stale() {
    let app = TestApp::new().await;
    let t = now();
    app.deliver(&checkout_completed("evt_1", t)).await;
    app.deliver(&subscription_event(
        "evt_3",
        "customer.subscription.updated",
        t + 10,
        "past_due",
    ))
    .await;

    let (status, body) = app
        .deliver(&subscription_event(
            "evt_2",
            "customer.subscription.updated",
            t + 5,
            "active",
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "stale");
    assert_eq!(app.status_of("sub_1").await, Some(SubscriptionStatus::PastDue));
}

// =============================================================================
// Verification Failures
// =============================================================================

#[tokio::test]
async fn missing_signature_is_rejected_and_not_recorded() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_webhook(checkout_completed("evt_1", now()).to_string(), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["code"].is_string());
    assert_eq!(app.store.processed_event_count().await, 0);
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let app = TestApp::new().await;
    let payload = checkout_completed("evt_1", now()).to_string();
    let mut mac = Hmac::<Sha256>::new_from_slice(b"whsec_other").unwrap();
    let t = now();
    mac.update(format!("{}.", t).as_bytes());
    mac.update(payload.as_bytes());
    let header = format!("t={},v1={}", t, hex::encode(mac.finalize().into_bytes()));

    let (status, _) = app.post_webhook(payload, Some(header)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.status_of("sub_1").await.is_none());
}

#[tokio::test]
async fn expired_signature_is_rejected() {
    let app = TestApp::new().await;
    let payload = checkout_completed("evt_1", now()).to_string();
    let header = sign(payload.as_bytes(), now() - 3600);

    let (status, _) = app.post_webhook(payload, Some(header)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn body_changed_after_signing_is_rejected() {
    let app = TestApp::new().await;
    let payload = checkout_completed("evt_1", now()).to_string();
    let header = sign(payload.as_bytes(), now());
    let tampered = payload.replace("sub_1", "sub_2");

    let (status, _) = app.post_webhook(tampered, Some(header)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
