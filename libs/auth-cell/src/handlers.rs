// libs/auth-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::jwt::issue_token;

use crate::models::{AuthError, LoginRequest, RegisterRequest, SessionResponse};
use crate::services::account::AccountService;

fn map_auth_error(e: AuthError) -> AppError {
    match e {
        AuthError::EmailTaken => AppError::Conflict("Email is already registered".to_string()),
        AuthError::InvalidCredentials => AppError::Auth("Invalid email or password".to_string()),
        AuthError::UserNotFound => AppError::NotFound("User not found".to_string()),
        AuthError::Validation(msg) => AppError::Validation(msg),
        AuthError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(state.db.clone());

    let user = service.register(request).map_err(map_auth_error)?;

    // Registration doubles as login: hand back a live session.
    let token = issue_token(
        &user.auth_identity(),
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(AppError::Internal)?;

    Ok(Json(json!({
        "success": true,
        "session": SessionResponse { token, user },
        "message": "Registration successful"
    })))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(state.db.clone());

    let user = service.login(request).map_err(map_auth_error)?;

    let token = issue_token(
        &user.auth_identity(),
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(AppError::Internal)?;

    Ok(Json(json!({
        "success": true,
        "session": SessionResponse { token, user },
        "message": "Login successful"
    })))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(state.db.clone());

    // The token is trusted for identity, the store for current state:
    // role changes and approvals show up without re-login.
    let record = service.fetch_user(user.id).map_err(map_auth_error)?;

    Ok(Json(json!(record)))
}
