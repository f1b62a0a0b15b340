// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<AppointmentStatus> {
        match s {
            "booked" => Some(AppointmentStatus::Booked),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing row joined with the participant and slot fields clients
/// render: who, with whom, and when.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub doctor_specialization: Option<String>,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub slot_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

/// `role` mirrors the client's historical query shape; the server scopes
/// by the authenticated role and never trusts the parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentListQuery {
    pub role: Option<String>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("appointment not found")]
    NotFound,

    #[error("slot not found")]
    SlotNotFound,

    #[error("slot does not belong to the requested doctor")]
    DoctorMismatch,

    #[error("slot is already booked")]
    SlotTaken,

    #[error("only patients can book appointments")]
    NotAPatient,

    #[error("not authorized for this appointment")]
    NotAuthorized,

    #[error("no transition from {from} is permitted")]
    InvalidTransition { from: AppointmentStatus },

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn from_db(err: anyhow::Error) -> Self {
        match err.downcast::<AppointmentError>() {
            Ok(domain) => domain,
            Err(other) => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
