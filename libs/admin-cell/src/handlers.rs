// libs/admin-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{AdminError, UpdateUserRequest};
use crate::services::approval::DoctorApprovalService;
use crate::services::users::UserAdminService;

fn map_admin_error(e: AdminError) -> AppError {
    match e {
        AdminError::UserNotFound => AppError::NotFound("User not found".to_string()),
        AdminError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AdminError::NotPending => {
            AppError::State("Doctor is not awaiting approval".to_string())
        }
        AdminError::SelfModification => {
            AppError::Validation("Admins cannot modify their own account".to_string())
        }
        AdminError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// DOCTOR APPROVAL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn pending_doctors(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let doctors = DoctorApprovalService::new(state.db.clone())
        .pending_doctors()
        .map_err(map_admin_error)?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn approve_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    DoctorApprovalService::new(state.db.clone())
        .approve(doctor_id)
        .map_err(map_admin_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor approved"
    })))
}

#[axum::debug_handler]
pub async fn reject_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    DoctorApprovalService::new(state.db.clone())
        .reject(doctor_id)
        .map_err(map_admin_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor rejected"
    })))
}

// ==============================================================================
// USER MANAGEMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let users = UserAdminService::new(state.db.clone())
        .list_users()
        .map_err(map_admin_error)?;

    Ok(Json(json!({
        "success": true,
        "users": users
    })))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let record = UserAdminService::new(state.db.clone())
        .get_user(user_id)
        .map_err(map_admin_error)?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let record = UserAdminService::new(state.db.clone())
        .update_role(&user, user_id, request.role)
        .map_err(map_admin_error)?;

    Ok(Json(json!({
        "success": true,
        "user": record,
        "message": "User updated"
    })))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    UserAdminService::new(state.db.clone())
        .delete_user(&user, user_id)
        .map_err(map_admin_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "User deleted"
    })))
}
