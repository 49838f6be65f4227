//! Axum router configuration for account endpoints.

use axum::{middleware, routing::post, Router};

use crate::adapters::http::middleware::auth_middleware;
use crate::adapters::http::state::AppState;

use super::handlers::{change_password, login, logout, register};

/// Create the account router.
///
/// # Routes
/// - `POST /register` - Create an account
/// - `POST /login` - Start a session
/// - `POST /logout` - End the session
/// - `POST /password` - Change password (logged in)
pub fn account_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::adapters::auth::{Argon2PasswordHasher, MockSessionTokens};
    use crate::adapters::http::state::HttpSettings;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::stripe::MockCheckoutProvider;
    use crate::domain::billing::StripeWebhookVerifier;

    fn app_with(settings: HttpSettings) -> (Router, InMemoryStore) {
        let store = InMemoryStore::new();
        let state = AppState::new(
            store.users(),
            store.billing(),
            Arc::new(MockCheckoutProvider::new()),
            Arc::new(StripeWebhookVerifier::new(SecretString::new(
                "whsec_account_test".to_string(),
            ))),
            Arc::new(Argon2PasswordHasher::new()),
            Arc::new(MockSessionTokens::new()),
            settings,
        );
        (account_routes(&state).with_state(state), store)
    }

    fn app() -> (Router, InMemoryStore) {
        app_with(HttpSettings::default())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, password: &str) -> StatusCode {
        app.clone()
            .oneshot(post_json(
                "/register",
                json!({ "email": email, "password": password }),
            ))
            .await
            .unwrap()
            .status()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Register Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn register_creates_account() {
        let (app, store) = app();

        let response = app
            .oneshot(post_json(
                "/register",
                json!({ "email": "New@Example.com", "password": "long-enough" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["email"], "new@example.com");
        assert_eq!(json["has_access"], false);
        assert!(json.get("password_hash").is_none());
        assert!(store.user_by_email("new@example.com").await.is_some());
    }

    #[tokio::test]
    async fn register_twice_is_409() {
        let (app, _) = app();

        assert_eq!(register(&app, "a@example.com", "long-enough").await, StatusCode::CREATED);
        assert_eq!(register(&app, "A@example.com", "long-enough").await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_with_short_password_is_400() {
        let (app, _) = app();

        assert_eq!(register(&app, "a@example.com", "short").await, StatusCode::BAD_REQUEST);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Login / Logout Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn login_sets_cookie_and_returns_token() {
        let (app, _) = app();
        register(&app, "a@example.com", "long-enough").await;

        let response = app
            .oneshot(post_json(
                "/login",
                json!({ "email": "a@example.com", "password": "long-enough" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("session=mock-token-"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));

        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["token"].as_str().unwrap().starts_with("mock-token-"));
    }

    #[tokio::test]
    async fn login_cookie_is_secure_when_configured() {
        let (app, _) = app_with(HttpSettings {
            secure_cookies: true,
            ..Default::default()
        });
        register(&app, "a@example.com", "long-enough").await;

        let response = app
            .oneshot(post_json(
                "/login",
                json!({ "email": "a@example.com", "password": "long-enough" }),
            ))
            .await
            .unwrap();

        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().ends_with("; Secure"));
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_401() {
        let (app, _) = app();
        register(&app, "a@example.com", "long-enough").await;

        let response = app
            .oneshot(post_json(
                "/login",
                json!({ "email": "a@example.com", "password": "wrong-password" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let (app, _) = app();

        let response = app
            .oneshot(post_json("/logout", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Change Password Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn change_password_requires_login() {
        let (app, _) = app();

        let response = app
            .oneshot(post_json(
                "/password",
                json!({ "currentPassword": "a", "newPassword": "b" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_then_login_with_new_password() {
        let (app, _) = app();
        register(&app, "a@example.com", "long-enough").await;

        let login = app
            .clone()
            .oneshot(post_json(
                "/login",
                json!({ "email": "a@example.com", "password": "long-enough" }),
            ))
            .await
            .unwrap();
        let token = body_json(login).await["token"]
            .as_str()
            .unwrap()
            .to_string();

        let change = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/password")
                    .header("Content-Type", "application/json")
                    .header("Cookie", format!("session={}", token))
                    .body(Body::from(
                        json!({
                            "currentPassword": "long-enough",
                            "newPassword": "even-longer-one"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(change.status(), StatusCode::NO_CONTENT);

        let relogin = app
            .oneshot(post_json(
                "/login",
                json!({ "email": "a@example.com", "password": "even-longer-one" }),
            ))
            .await
            .unwrap();
        assert_eq!(relogin.status(), StatusCode::OK);
    }
}
