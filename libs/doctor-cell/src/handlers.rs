// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreateSlotRequest, DoctorError, DoctorSearchQuery};
use crate::services::availability::AvailabilityService;
use crate::services::doctor::DoctorService;

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        DoctorError::NotOwner => {
            AppError::Forbidden("Not authorized to manage this doctor's availability".to_string())
        }
        DoctorError::NotApproved => {
            AppError::Forbidden("Doctor is not approved for bookings".to_string())
        }
        DoctorError::SlotBooked => {
            AppError::Conflict("Slot is referenced by an active appointment".to_string())
        }
        DoctorError::SlotOverlap => {
            AppError::Conflict("Slot overlaps an existing availability window".to_string())
        }
        DoctorError::Validation(msg) => AppError::Validation(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC CATALOGUE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(state.db.clone())
        .list_doctors(query)
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let detail = DoctorService::new(state.db.clone())
        .get_doctor(doctor_id)
        .map_err(map_doctor_error)?;

    Ok(Json(json!(detail)))
}

// ==============================================================================
// SLOT REGISTRY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let slot = AvailabilityService::new(state.db.clone())
        .create_slot(&user, doctor_id, request)
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
        "message": "Availability added"
    })))
}

#[axum::debug_handler]
pub async fn list_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let slots = AvailabilityService::new(state.db.clone())
        .list_slots(&user, doctor_id)
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<Arc<AppState>>,
    Path((doctor_id, slot_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    AvailabilityService::new(state.db.clone())
        .delete_slot(&user, doctor_id, slot_id)
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Availability removed"
    })))
}
