// libs/doctor-cell/src/services/doctor.rs
use rusqlite::{params_from_iter, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use shared_database::Db;

use crate::models::{DoctorDetail, DoctorError, DoctorProfile, DoctorSearchQuery, DoctorSummary};
use crate::services::availability::AvailabilityService;

/// Patient-facing doctor catalogue. The approved-only filter lives in
/// these queries - the read boundary - so unapproved doctors can never
/// leak into a response regardless of search terms.
pub struct DoctorService {
    db: Db,
}

impl DoctorService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn list_doctors(&self, query: DoctorSearchQuery) -> Result<Vec<DoctorSummary>, DoctorError> {
        debug!("listing approved doctors with filters: {:?}", query);

        let mut sql = String::from(
            "SELECT u.id, u.name, u.email, p.specialization, p.qualifications,
                    p.experience_years, p.consultation_fee, p.bio, p.image_url
             FROM users u
             JOIN doctor_profiles p ON p.user_id = u.id
             WHERE u.role = 'doctor' AND u.approval_status = 'approved'",
        );
        let mut params: Vec<String> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sql.push_str(" AND (LOWER(u.name) LIKE ? OR LOWER(p.specialization) LIKE ?)");
            let needle = format!("%{}%", search.to_lowercase());
            params.push(needle.clone());
            params.push(needle);
        }
        if let Some(specialization) = query
            .specialization
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sql.push_str(" AND LOWER(p.specialization) = ?");
            params.push(specialization.to_lowercase());
        }

        sql.push_str(" ORDER BY u.name");

        let doctors = self
            .db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                    Ok(map_doctor_row(row))
                })?;

                let mut doctors = Vec::new();
                for row in rows {
                    doctors.push(row??);
                }
                Ok(doctors)
            })
            .map_err(DoctorError::from_db)?;

        Ok(doctors)
    }

    /// Doctor detail plus currently free slots, as the booking flow
    /// consumes it.
    pub fn get_doctor(&self, doctor_id: Uuid) -> Result<DoctorDetail, DoctorError> {
        let doctor = self
            .db
            .with_conn(|conn| {
                let row = conn
                    .query_row(
                        "SELECT u.id, u.name, u.email, p.specialization, p.qualifications,
                                p.experience_years, p.consultation_fee, p.bio, p.image_url
                         FROM users u
                         JOIN doctor_profiles p ON p.user_id = u.id
                         WHERE u.id = ?1 AND u.role = 'doctor' AND u.approval_status = 'approved'",
                        [doctor_id.to_string()],
                        |row| Ok(map_doctor_row(row)),
                    )
                    .optional()?;
                row.transpose()
            })
            .map_err(DoctorError::from_db)?
            .ok_or(DoctorError::NotFound)?;

        let available_slots =
            AvailabilityService::new(self.db.clone()).list_free_slots(doctor_id)?;

        Ok(DoctorDetail {
            doctor,
            available_slots,
        })
    }
}

fn map_doctor_row(row: &Row) -> anyhow::Result<DoctorSummary> {
    let id: String = row.get(0)?;
    let qualifications_json: String = row.get(4)?;

    Ok(DoctorSummary {
        id: Uuid::parse_str(&id)?,
        name: row.get(1)?,
        email: row.get(2)?,
        profile: DoctorProfile {
            specialization: row.get(3)?,
            qualifications: serde_json::from_str(&qualifications_json)?,
            experience_years: row.get(5)?,
            consultation_fee: row.get(6)?,
            bio: row.get(7)?,
            image_url: row.get(8)?,
        },
    })
}
