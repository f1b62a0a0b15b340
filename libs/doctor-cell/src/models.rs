// libs/doctor-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// DOCTOR CATALOGUE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub specialization: String,
    pub qualifications: Vec<String>,
    pub experience_years: i32,
    pub consultation_fee: Option<f64>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

/// Patient-facing doctor record. Only approved doctors are ever
/// materialized into this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile: DoctorProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDetail {
    pub doctor: DoctorSummary,
    pub available_slots: Vec<AvailabilitySlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSearchQuery {
    pub search: Option<String>,
    pub specialization: Option<String>,
}

// ==============================================================================
// SLOT REGISTRY MODELS
// ==============================================================================

/// A doctor-authored bookable time window. Wall-clock, single day,
/// start strictly before end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Management view of a slot: owners also see windows a patient has
/// already claimed.
#[derive(Debug, Clone, Serialize)]
pub struct SlotWithStatus {
    #[serde(flatten)]
    pub slot: AvailabilitySlot,
    pub is_booked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("doctor not found")]
    NotFound,

    #[error("slot not found")]
    SlotNotFound,

    #[error("not the owner of this slot")]
    NotOwner,

    #[error("doctor is not approved")]
    NotApproved,

    #[error("slot is referenced by an active appointment")]
    SlotBooked,

    #[error("slot overlaps an existing availability window")]
    SlotOverlap,

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl DoctorError {
    pub fn from_db(err: anyhow::Error) -> Self {
        match err.downcast::<DoctorError>() {
            Ok(domain) => domain,
            Err(other) => DoctorError::DatabaseError(other.to_string()),
        }
    }
}
