//! Authentication API endpoints

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{error_response, AppState};
use crate::auth::accounts::{AuthError, NewUser, User};

/// Build auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/validate", get(validate))
}

/// Resolve the bearer token on a request to its user
pub(super) async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();

    if token.is_empty() {
        return Err(error_response(StatusCode::UNAUTHORIZED, "login required"));
    }

    let service = state.accounts();
    match service.validate_token(token).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "session expired, please log in again",
        )),
        Err(e) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Signup request
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub gmail: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Signup response
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: String,
    pub username: String,
    pub gmail: String,
}

/// Register a new user
async fn signup(State(state): State<AppState>, Json(req): Json<SignupRequest>) -> Response {
    let service = state.accounts();
    let new_user = NewUser {
        username: &req.username,
        gmail: &req.gmail,
        phone: req.phone.as_deref(),
        password: &req.password,
    };

    match service.signup(&new_user).await {
        Ok(user) => {
            info!("Signup successful for {}", user.username);
            (
                StatusCode::CREATED,
                Json(SignupResponse {
                    user_id: user.id,
                    username: user.username,
                    gmail: user.gmail,
                }),
            )
                .into_response()
        }
        Err(e @ AuthError::UsernameExists) => {
            info!("Signup rejected for {}: {}", req.username, e);
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e @ AuthError::InvalidInput(_)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => {
            warn!("Signup failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error. Please try again later.",
            )
        }
    }
}

/// Login request; `login` is a username or gmail address
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "gmail", alias = "username")]
    pub login: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

/// Login with username or gmail and password
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let service = state.accounts();

    match service.login(&req.login, &req.password).await {
        Ok((user, token)) => {
            info!("Login successful for {}", user.username);
            (
                StatusCode::OK,
                Json(LoginResponse {
                    token,
                    user_id: user.id,
                    username: user.username,
                }),
            )
                .into_response()
        }
        Err(e @ AuthError::InvalidCredentials) => {
            info!("Invalid credentials for {}", req.login);
            error_response(StatusCode::UNAUTHORIZED, e.to_string())
        }
        Err(e) => {
            warn!("Login failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error. Please try again later.",
            )
        }
    }
}

/// Logout request
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Logout by invalidating token
async fn logout(State(state): State<AppState>, Json(req): Json<LogoutRequest>) -> Response {
    let service = state.accounts();

    match service.logout(&req.token).await {
        Ok(success) => (StatusCode::OK, Json(LogoutResponse { success })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Validate query params
#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub token: String,
}

/// Validate response
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Validate a token
async fn validate(
    State(state): State<AppState>,
    Query(params): Query<ValidateQuery>,
) -> impl IntoResponse {
    let service = state.accounts();

    match service.validate_token(&params.token).await {
        Ok(Some(user)) => Json(ValidateResponse {
            valid: true,
            user_id: Some(user.id),
            username: Some(user.username),
        }),
        Ok(None) | Err(_) => Json(ValidateResponse {
            valid: false,
            user_id: None,
            username: None,
        }),
    }
}
