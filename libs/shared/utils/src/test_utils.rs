use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::Db;
use shared_models::auth::{ApprovalStatus, AuthUser, Role};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: ":memory:".to_string(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: 24,
            port: 3000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approval_status: Option<ApprovalStatus>,
}

impl TestUser {
    pub fn new(name: &str, email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            approval_status: match role {
                Role::Doctor => Some(ApprovalStatus::Approved),
                _ => None,
            },
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new("Test Patient", email, Role::Patient)
    }

    pub fn doctor(email: &str) -> Self {
        Self::new("Test Doctor", email, Role::Doctor)
    }

    pub fn pending_doctor(email: &str) -> Self {
        let mut user = Self::doctor(email);
        user.approval_status = Some(ApprovalStatus::Pending);
        user
    }

    pub fn admin(email: &str) -> Self {
        Self::new("Test Admin", email, Role::Admin)
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
            approval_status: self.approval_status,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str) -> String {
        issue_token(&user.to_auth_user(), secret, 24).expect("test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        issue_token(&user.to_auth_user(), secret, -1).expect("test token")
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        issue_token(&user.to_auth_user(), "wrong-secret", 24).expect("test token")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Insert a user row (and, for doctors, a profile) directly, bypassing
/// registration. The password hash is a placeholder; seeded users are
/// authenticated through test tokens, not credentials.
pub fn seed_user(db: &Db, user: &TestUser) {
    let now = Utc::now().to_rfc3339();
    db.with_tx(|tx| {
        tx.execute(
            "INSERT INTO users (id, name, email, password_hash, role, approval_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                "unusable-test-hash",
                user.role.as_str(),
                user.approval_status.map(|s| s.as_str()),
                now,
                now,
            ],
        )?;

        if user.role == Role::Doctor {
            tx.execute(
                "INSERT INTO doctor_profiles (user_id, specialization, qualifications, experience_years, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id.to_string(),
                    "General Medicine",
                    "[\"MBBS\"]",
                    5,
                    now,
                    now,
                ],
            )?;
        }
        Ok(())
    })
    .expect("seed user");
}

/// Insert an availability slot for a doctor and return its id.
pub fn seed_slot(db: &Db, doctor_id: Uuid, date: &str, start: &str, end: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();
    db.with_tx(|tx| {
        tx.execute(
            "INSERT INTO availability_slots (id, doctor_id, slot_date, start_time, end_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id.to_string(), doctor_id.to_string(), date, start, end, now],
        )?;
        Ok(())
    })
    .expect("seed slot");
    id
}
