// libs/admin-cell/src/services/users.rs
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use shared_database::Db;
use shared_models::auth::{ApprovalStatus, AuthUser, Role};

use crate::models::{AdminError, ManagedUser};

pub struct UserAdminService {
    db: Db,
}

impl UserAdminService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn list_users(&self) -> Result<Vec<ManagedUser>, AdminError> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, email, role, approval_status, created_at
                     FROM users ORDER BY created_at",
                )?;
                let rows = stmt.query_map([], |row| Ok(map_managed_user(row)))?;

                let mut users = Vec::new();
                for row in rows {
                    users.push(row??);
                }
                Ok(users)
            })
            .map_err(AdminError::from_db)
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<ManagedUser, AdminError> {
        self.db
            .with_conn(|conn| {
                let row = conn
                    .query_row(
                        "SELECT id, name, email, role, approval_status, created_at
                         FROM users WHERE id = ?1",
                        [user_id.to_string()],
                        |row| Ok(map_managed_user(row)),
                    )
                    .optional()?;
                row.transpose()
            })
            .map_err(AdminError::from_db)?
            .ok_or(AdminError::UserNotFound)
    }

    /// Change a user's role. Moving a user into the doctor role puts
    /// them through the approval workflow like any registration; moving
    /// them out clears the approval state and profile.
    pub fn update_role(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
        new_role: Role,
    ) -> Result<ManagedUser, AdminError> {
        if actor.id == user_id {
            return Err(AdminError::SelfModification);
        }

        self.db
            .with_tx(|tx| {
                let current: Option<String> = tx
                    .query_row(
                        "SELECT role FROM users WHERE id = ?1",
                        [user_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?;

                let Some(current_role) = current else {
                    return Err(AdminError::UserNotFound.into());
                };

                // A no-op change must not reset a doctor's approval state.
                if current_role == new_role.as_str() {
                    return Ok(());
                }

                let now = Utc::now().to_rfc3339();
                let approval = match new_role {
                    Role::Doctor => Some(ApprovalStatus::Pending.as_str()),
                    _ => None,
                };

                tx.execute(
                    "UPDATE users SET role = ?1, approval_status = ?2, updated_at = ?3 WHERE id = ?4",
                    params![new_role.as_str(), approval, now, user_id.to_string()],
                )?;

                if new_role == Role::Doctor && current_role != "doctor" {
                    ensure_profile_row(tx, user_id, &now)?;
                } else if new_role != Role::Doctor && current_role == "doctor" {
                    tx.execute(
                        "DELETE FROM doctor_profiles WHERE user_id = ?1",
                        [user_id.to_string()],
                    )?;
                }
                Ok(())
            })
            .map_err(AdminError::from_db)?;

        info!("user {} role changed to {} by {}", user_id, new_role, actor.id);
        self.get_user(user_id)
    }

    /// Remove a user. Their profile, slots and appointments go with
    /// them through the schema's cascade rules.
    pub fn delete_user(&self, actor: &AuthUser, user_id: Uuid) -> Result<(), AdminError> {
        if actor.id == user_id {
            return Err(AdminError::SelfModification);
        }

        let deleted = self
            .db
            .with_tx(|tx| {
                let count =
                    tx.execute("DELETE FROM users WHERE id = ?1", [user_id.to_string()])?;
                Ok(count)
            })
            .map_err(AdminError::from_db)?;

        if deleted == 0 {
            return Err(AdminError::UserNotFound);
        }

        info!("user {} deleted by {}", user_id, actor.id);
        Ok(())
    }
}

/// A user promoted to doctor starts with an empty profile they can
/// fill in; registration-created profiles are left untouched.
fn ensure_profile_row(tx: &Transaction, user_id: Uuid, now: &str) -> anyhow::Result<()> {
    tx.execute(
        "INSERT INTO doctor_profiles (user_id, specialization, qualifications, experience_years, created_at, updated_at)
         VALUES (?1, '', '[]', 0, ?2, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id.to_string(), now],
    )?;
    Ok(())
}

fn map_managed_user(row: &Row) -> anyhow::Result<ManagedUser> {
    let id: String = row.get(0)?;
    let role: String = row.get(3)?;
    let approval: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok(ManagedUser {
        id: Uuid::parse_str(&id)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: Role::parse(&role).ok_or_else(|| anyhow::anyhow!("invalid role: {}", role))?,
        approval_status: approval.as_deref().and_then(ApprovalStatus::parse),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}
