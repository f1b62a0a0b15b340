// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::Db;
use shared_models::auth::{AuthUser, Role};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus, AppointmentView,
    BookAppointmentRequest,
};

/// The single authoritative operation that turns a free slot plus a
/// patient request into an appointment. The existence check and the
/// insert run inside one IMMEDIATE transaction, and the partial unique
/// index on live appointments backs the same invariant in the schema,
/// so concurrent bookers for one slot cannot both succeed.
pub struct AppointmentBookingService {
    db: Db,
}

impl AppointmentBookingService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn book(
        &self,
        actor: &AuthUser,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if !actor.is_patient() {
            return Err(AppointmentError::NotAPatient);
        }

        debug!(
            "booking slot {} with doctor {} for patient {}",
            request.slot_id, request.doctor_id, actor.id
        );

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            slot_id: request.slot_id,
            patient_id: actor.id,
            doctor_id: request.doctor_id,
            status: AppointmentStatus::Booked,
            reason: request
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        self.db
            .with_tx(|tx| {
                let slot_owner: Option<String> = tx
                    .query_row(
                        "SELECT doctor_id FROM availability_slots WHERE id = ?1",
                        [request.slot_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?;

                let Some(slot_owner) = slot_owner else {
                    return Err(AppointmentError::SlotNotFound.into());
                };
                if slot_owner != request.doctor_id.to_string() {
                    return Err(AppointmentError::DoctorMismatch.into());
                }

                let taken: bool = tx.query_row(
                    "SELECT COUNT(*) > 0 FROM appointments
                     WHERE slot_id = ?1 AND status != 'cancelled'",
                    [request.slot_id.to_string()],
                    |row| row.get(0),
                )?;
                if taken {
                    return Err(AppointmentError::SlotTaken.into());
                }

                let inserted = tx.execute(
                    "INSERT INTO appointments (id, slot_id, patient_id, doctor_id, status, reason, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        appointment.id.to_string(),
                        appointment.slot_id.to_string(),
                        appointment.patient_id.to_string(),
                        appointment.doctor_id.to_string(),
                        appointment.status.as_str(),
                        appointment.reason,
                        appointment.created_at.to_rfc3339(),
                        appointment.updated_at.to_rfc3339(),
                    ],
                );

                match inserted {
                    Ok(_) => Ok(()),
                    // The unique index on live slot references is the
                    // storage-level backstop for the check above.
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == ErrorCode::ConstraintViolation =>
                    {
                        warn!("unique index rejected booking for slot {}", request.slot_id);
                        Err(AppointmentError::SlotTaken.into())
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .map_err(AppointmentError::from_db)?;

        info!(
            "appointment {} booked for patient {} with doctor {}",
            appointment.id, appointment.patient_id, appointment.doctor_id
        );
        Ok(appointment)
    }

    /// Fetch a single appointment; participants and admins only.
    pub fn get(&self, actor: &AuthUser, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .db
            .with_conn(|conn| load_appointment(conn, appointment_id))
            .map_err(AppointmentError::from_db)?
            .ok_or(AppointmentError::NotFound)?;

        let is_participant =
            actor.id == appointment.patient_id || actor.id == appointment.doctor_id;
        if !is_participant && !actor.is_admin() {
            return Err(AppointmentError::NotAuthorized);
        }

        Ok(appointment)
    }

    /// Role-scoped listing: patients see their own bookings, doctors
    /// their own schedule, admins everything.
    pub fn list_for(
        &self,
        actor: &AuthUser,
        query: AppointmentListQuery,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        let mut sql = String::from(
            "SELECT a.id, a.status, a.reason,
                    a.doctor_id, d.name, p_doc.specialization,
                    a.patient_id, p.name, p.email,
                    a.slot_id, s.slot_date, s.start_time, s.end_time
             FROM appointments a
             JOIN users d ON d.id = a.doctor_id
             LEFT JOIN doctor_profiles p_doc ON p_doc.user_id = a.doctor_id
             JOIN users p ON p.id = a.patient_id
             JOIN availability_slots s ON s.id = a.slot_id
             WHERE 1=1",
        );
        let mut params: Vec<String> = Vec::new();

        match actor.role {
            Role::Patient => {
                sql.push_str(" AND a.patient_id = ?");
                params.push(actor.id.to_string());
            }
            Role::Doctor => {
                sql.push_str(" AND a.doctor_id = ?");
                params.push(actor.id.to_string());
            }
            Role::Admin => {}
        }

        if let Some(status) = query.status {
            sql.push_str(" AND a.status = ?");
            params.push(status.as_str().to_string());
        }

        sql.push_str(" ORDER BY s.slot_date, s.start_time");

        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    rusqlite::params_from_iter(params.iter()),
                    |row| Ok(map_view_row(row)),
                )?;

                let mut views = Vec::new();
                for row in rows {
                    views.push(row??);
                }
                Ok(views)
            })
            .map_err(AppointmentError::from_db)
    }
}

/// Shared row loader used by the booking and lifecycle services.
pub(crate) fn load_appointment(
    conn: &Connection,
    appointment_id: Uuid,
) -> anyhow::Result<Option<Appointment>> {
    let row = conn
        .query_row(
            "SELECT id, slot_id, patient_id, doctor_id, status, reason, created_at, updated_at
             FROM appointments WHERE id = ?1",
            [appointment_id.to_string()],
            |row| Ok(map_appointment_row(row)),
        )
        .optional()?;
    row.transpose()
}

fn map_appointment_row(row: &Row) -> anyhow::Result<Appointment> {
    let id: String = row.get(0)?;
    let slot_id: String = row.get(1)?;
    let patient_id: String = row.get(2)?;
    let doctor_id: String = row.get(3)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Appointment {
        id: Uuid::parse_str(&id)?,
        slot_id: Uuid::parse_str(&slot_id)?,
        patient_id: Uuid::parse_str(&patient_id)?,
        doctor_id: Uuid::parse_str(&doctor_id)?,
        status: AppointmentStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("invalid appointment status: {}", status))?,
        reason: row.get(5)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn map_view_row(row: &Row) -> anyhow::Result<AppointmentView> {
    let id: String = row.get(0)?;
    let status: String = row.get(1)?;
    let doctor_id: String = row.get(3)?;
    let patient_id: String = row.get(6)?;
    let slot_id: String = row.get(9)?;
    let date: String = row.get(10)?;
    let start_time: String = row.get(11)?;
    let end_time: String = row.get(12)?;

    Ok(AppointmentView {
        id: Uuid::parse_str(&id)?,
        status: AppointmentStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("invalid appointment status: {}", status))?,
        reason: row.get(2)?,
        doctor_id: Uuid::parse_str(&doctor_id)?,
        doctor_name: row.get(4)?,
        doctor_specialization: row.get(5)?,
        patient_id: Uuid::parse_str(&patient_id)?,
        patient_name: row.get(7)?,
        patient_email: row.get(8)?,
        slot_id: Uuid::parse_str(&slot_id)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")?,
        start_time: NaiveTime::parse_from_str(&start_time, "%H:%M:%S")?,
        end_time: NaiveTime::parse_from_str(&end_time, "%H:%M:%S")?,
    })
}

fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
