// libs/auth-cell/src/services/account.rs
use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use regex::Regex;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Db;
use shared_models::auth::{ApprovalStatus, Role};

use crate::models::{AuthError, LoginRequest, PublicUser, RegisterRequest};

const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub struct AccountService {
    db: Db,
}

impl AccountService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a user account. Doctors additionally get a profile row and
    /// start in the pending approval state; both rows are written in one
    /// transaction so a half-registered doctor cannot exist.
    pub fn register(&self, request: RegisterRequest) -> Result<PublicUser, AuthError> {
        let role = request.role.unwrap_or(Role::Patient);
        self.validate_registration(&request, role)?;

        let password_hash = hash_password(&request.password)?;
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let approval_status = match role {
            Role::Doctor => Some(ApprovalStatus::Pending),
            _ => None,
        };

        let email = request.email.trim().to_lowercase();
        let name = request.name.trim().to_string();

        self.db
            .with_tx(|tx| {
                let taken: bool = tx.query_row(
                    "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
                    [&email],
                    |row| row.get(0),
                )?;
                if taken {
                    return Err(AuthError::EmailTaken.into());
                }

                tx.execute(
                    "INSERT INTO users (id, name, email, password_hash, role, approval_status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        id.to_string(),
                        name,
                        email,
                        password_hash,
                        role.as_str(),
                        approval_status.map(|s| s.as_str()),
                        now,
                        now,
                    ],
                )?;

                if role == Role::Doctor {
                    let qualifications = serde_json::to_string(
                        request.qualifications.as_deref().unwrap_or(&[]),
                    )?;
                    tx.execute(
                        "INSERT INTO doctor_profiles
                             (user_id, specialization, qualifications, experience_years,
                              consultation_fee, bio, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        params![
                            id.to_string(),
                            request.specialization.as_deref().unwrap_or_default().trim(),
                            qualifications,
                            request.experience_years.unwrap_or(0),
                            request.consultation_fee,
                            request.bio,
                            now,
                            now,
                        ],
                    )?;
                }

                Ok(())
            })
            .map_err(AuthError::from_db)?;

        info!("registered user {} with role {}", id, role);

        Ok(PublicUser {
            id,
            name,
            email,
            role,
            approval_status,
        })
    }

    /// Verify credentials and return the stored user record. The same
    /// error covers an unknown email and a wrong password.
    pub fn login(&self, request: LoginRequest) -> Result<PublicUser, AuthError> {
        let email = request.email.trim().to_lowercase();

        let row = self
            .db
            .with_conn(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name, email, role, approval_status, password_hash
                         FROM users WHERE email = ?1",
                        [&email],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Option<String>>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?)
            })
            .map_err(AuthError::from_db)?;

        let Some((id, name, email, role, approval, password_hash)) = row else {
            debug!("login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&request.password, &password_hash) {
            debug!("password verification failed for {}", id);
            return Err(AuthError::InvalidCredentials);
        }

        parse_public_user(&id, &name, &email, &role, approval.as_deref())
    }

    /// Authoritative user record for the authenticated session.
    pub fn fetch_user(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        let row = self
            .db
            .with_conn(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name, email, role, approval_status
                         FROM users WHERE id = ?1",
                        [user_id.to_string()],
                        map_user_row,
                    )
                    .optional()?)
            })
            .map_err(AuthError::from_db)?;

        match row {
            Some((id, name, email, role, approval)) => {
                parse_public_user(&id, &name, &email, &role, approval.as_deref())
            }
            None => Err(AuthError::UserNotFound),
        }
    }

    fn validate_registration(
        &self,
        request: &RegisterRequest,
        role: Role,
    ) -> Result<(), AuthError> {
        if request.name.trim().is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }
        if !email_regex().is_match(request.email.trim()) {
            return Err(AuthError::Validation("Email is invalid".to_string()));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if role == Role::Doctor {
            if request
                .specialization
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
            {
                return Err(AuthError::Validation(
                    "Specialization is required for doctors".to_string(),
                ));
            }
            if request
                .qualifications
                .as_deref()
                .unwrap_or_default()
                .is_empty()
            {
                return Err(AuthError::Validation(
                    "Qualifications are required for doctors".to_string(),
                ));
            }
            match request.experience_years {
                Some(years) if years >= 0 => {}
                Some(_) => {
                    return Err(AuthError::Validation(
                        "Experience cannot be negative".to_string(),
                    ))
                }
                None => {
                    return Err(AuthError::Validation(
                        "Experience is required for doctors".to_string(),
                    ))
                }
            }
        }

        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::DatabaseError(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

type UserRow = (String, String, String, String, Option<String>);

fn map_user_row(row: &Row) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn parse_public_user(
    id: &str,
    name: &str,
    email: &str,
    role: &str,
    approval: Option<&str>,
) -> Result<PublicUser, AuthError> {
    let id = Uuid::parse_str(id)
        .map_err(|_| AuthError::DatabaseError(format!("invalid user id: {}", id)))?;
    let role = Role::parse(role)
        .ok_or_else(|| AuthError::DatabaseError(format!("invalid role: {}", role)))?;

    Ok(PublicUser {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        approval_status: approval.and_then(ApprovalStatus::parse),
    })
}
