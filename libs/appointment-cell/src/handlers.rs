// libs/appointment-cell/src/handlers.rs
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

use crate::models::{
    AppointmentError, AppointmentListQuery, BookAppointmentRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::lifecycle::AppointmentLifecycleService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        AppointmentError::DoctorMismatch => {
            AppError::Validation("Slot does not belong to the requested doctor".to_string())
        }
        AppointmentError::SlotTaken => {
            AppError::Conflict("Slot is no longer available".to_string())
        }
        AppointmentError::NotAPatient => {
            AppError::Forbidden("Only patients can book appointments".to_string())
        }
        AppointmentError::NotAuthorized => {
            AppError::Forbidden("Not authorized for this appointment".to_string())
        }
        AppointmentError::InvalidTransition { from } => {
            AppError::State(format!("No transition from {} is permitted", from))
        }
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(state.db.clone())
        .book(&user, request)
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentLifecycleService::new(state.db.clone())
        .transition(&user, appointment_id, request.status)
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment {}", appointment.status)
    })))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppointmentListQuery>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentBookingService::new(state.db.clone())
        .list_for(&user, query)
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(state.db.clone())
        .get(&user, appointment_id)
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}
