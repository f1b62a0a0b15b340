// libs/auth-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::{ApprovalStatus, AuthUser, Role};

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    // Required when registering as a doctor
    pub specialization: Option<String>,
    pub qualifications: Option<Vec<String>>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User record as exposed over the API; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approval_status: Option<ApprovalStatus>,
}

impl PublicUser {
    /// The identity a freshly issued session token should carry.
    pub fn auth_identity(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
            approval_status: self.approval_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: PublicUser,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl AuthError {
    /// Recover a domain error smuggled through the storage closure;
    /// anything else is a storage failure.
    pub fn from_db(err: anyhow::Error) -> Self {
        match err.downcast::<AuthError>() {
            Ok(domain) => domain,
            Err(other) => AuthError::DatabaseError(other.to_string()),
        }
    }
}
