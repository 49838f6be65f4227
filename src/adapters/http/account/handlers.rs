//! HTTP handlers for account endpoints.

use axum::extract::{Json, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::{clear_session_cookie, session_cookie, RequireAuth};
use crate::adapters::http::state::AppState;
use crate::application::handlers::{ChangePasswordCommand, LoginUserCommand, RegisterUserCommand};

use super::dto::{ChangePasswordRequest, CredentialsRequest, LoginResponse, UserResponse};

/// POST /register - Create an account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .register_handler()
        .handle(RegisterUserCommand {
            email: request.email,
            password: request.password,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /login - Check credentials and start a session
///
/// The token goes both into an HttpOnly cookie and into the body, so
/// browsers and API clients can use the same endpoint.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .login
        .handle(LoginUserCommand {
            email: request.email,
            password: request.password,
        })
        .await?;

    let max_age = (result.token.expires_at - chrono::Utc::now()).num_seconds();
    let cookie = session_cookie(
        &result.token.token,
        max_age,
        state.settings.secure_cookies,
    );

    let body = LoginResponse {
        success: true,
        user_id: result.user.id.to_string(),
        email: result.user.email,
        token: result.token.token,
        expires_at: result.token.expires_at.to_rfc3339(),
    };

    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// POST /logout - Drop the session cookie
///
/// Tokens are stateless; logging out only clears the browser's copy.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.settings.secure_cookies),
        )],
    )
}

/// POST /password - Change the password of the logged-in user
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .change_password_handler()
        .handle(ChangePasswordCommand {
            user,
            current_password: request.current_password,
            new_password: request.new_password,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
