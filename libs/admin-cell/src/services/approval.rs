// libs/admin-cell/src/services/approval.rs
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tracing::info;
use uuid::Uuid;

use shared_database::Db;
use shared_models::auth::ApprovalStatus;

use crate::models::{AdminError, PendingDoctor};

/// The admin-gated workflow by which a freshly registered doctor
/// becomes visible to patients. Approval state only ever moves
/// pending -> approved or pending -> rejected.
pub struct DoctorApprovalService {
    db: Db,
}

impl DoctorApprovalService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn pending_doctors(&self) -> Result<Vec<PendingDoctor>, AdminError> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT u.id, u.name, u.email, p.specialization, p.qualifications,
                            p.experience_years, u.created_at
                     FROM users u
                     JOIN doctor_profiles p ON p.user_id = u.id
                     WHERE u.role = 'doctor' AND u.approval_status = 'pending'
                     ORDER BY u.created_at",
                )?;
                let rows = stmt.query_map([], |row| {
                    let id: String = row.get(0)?;
                    let qualifications_json: String = row.get(4)?;
                    let created_at: String = row.get(6)?;
                    Ok((id, row.get::<_, String>(1)?, row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?, qualifications_json,
                        row.get::<_, i32>(5)?, created_at))
                })?;

                let mut doctors = Vec::new();
                for row in rows {
                    let (id, name, email, specialization, qualifications, experience, created) =
                        row?;
                    doctors.push(PendingDoctor {
                        id: Uuid::parse_str(&id)?,
                        name,
                        email,
                        specialization,
                        qualifications: serde_json::from_str(&qualifications)?,
                        experience_years: experience,
                        registered_at: DateTime::parse_from_rfc3339(&created)?
                            .with_timezone(&Utc),
                    });
                }
                Ok(doctors)
            })
            .map_err(AdminError::from_db)
    }

    pub fn approve(&self, doctor_id: Uuid) -> Result<(), AdminError> {
        self.set_approval(doctor_id, ApprovalStatus::Approved)
    }

    pub fn reject(&self, doctor_id: Uuid) -> Result<(), AdminError> {
        self.set_approval(doctor_id, ApprovalStatus::Rejected)
    }

    fn set_approval(&self, doctor_id: Uuid, status: ApprovalStatus) -> Result<(), AdminError> {
        self.db
            .with_tx(|tx| {
                let current: Option<(String, Option<String>)> = tx
                    .query_row(
                        "SELECT role, approval_status FROM users WHERE id = ?1",
                        [doctor_id.to_string()],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                match current {
                    None => return Err(AdminError::DoctorNotFound.into()),
                    Some((role, _)) if role != "doctor" => {
                        return Err(AdminError::DoctorNotFound.into())
                    }
                    Some((_, approval)) if approval.as_deref() != Some("pending") => {
                        return Err(AdminError::NotPending.into())
                    }
                    Some(_) => {}
                }

                tx.execute(
                    "UPDATE users SET approval_status = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![
                        status.as_str(),
                        Utc::now().to_rfc3339(),
                        doctor_id.to_string(),
                    ],
                )?;
                Ok(())
            })
            .map_err(AdminError::from_db)?;

        info!("doctor {} {}", doctor_id, status);
        Ok(())
    }
}
