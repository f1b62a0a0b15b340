// libs/admin-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::{ApprovalStatus, Role};

// ==============================================================================
// ADMIN VIEW MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ManagedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approval_status: Option<ApprovalStatus>,
    pub created_at: DateTime<Utc>,
}

/// A doctor awaiting approval, with the profile fields the reviewer
/// decides on.
#[derive(Debug, Clone, Serialize)]
pub struct PendingDoctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub qualifications: Vec<String>,
    pub experience_years: i32,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Role,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("user not found")]
    UserNotFound,

    #[error("doctor not found")]
    DoctorNotFound,

    #[error("doctor is not awaiting approval")]
    NotPending,

    #[error("admins cannot modify their own account")]
    SelfModification,

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl AdminError {
    pub fn from_db(err: anyhow::Error) -> Self {
        match err.downcast::<AdminError>() {
            Ok(domain) => domain,
            Err(other) => AdminError::DatabaseError(other.to_string()),
        }
    }
}
