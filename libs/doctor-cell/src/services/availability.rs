// libs/doctor-cell/src/services/availability.rs
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::Db;
use shared_models::auth::AuthUser;

use crate::models::{AvailabilitySlot, CreateSlotRequest, DoctorError, SlotWithStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Doctor-scoped CRUD over availability slots. A slot is free while no
/// non-cancelled appointment references it; freeness is always derived
/// from the appointments table, never cached on the slot.
pub struct AvailabilityService {
    db: Db,
}

impl AvailabilityService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create an availability window for a doctor. Only the owning
    /// (approved) doctor or an admin may publish slots.
    pub fn create_slot(
        &self,
        actor: &AuthUser,
        doctor_id: Uuid,
        request: CreateSlotRequest,
    ) -> Result<AvailabilitySlot, DoctorError> {
        if actor.id != doctor_id && !actor.is_admin() {
            return Err(DoctorError::NotOwner);
        }

        if request.start_time >= request.end_time {
            return Err(DoctorError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        if request.date < Utc::now().date_naive() {
            return Err(DoctorError::Validation(
                "Date cannot be in the past".to_string(),
            ));
        }

        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            doctor_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
        };
        let now = Utc::now().to_rfc3339();

        self.db
            .with_tx(|tx| {
                let approval: Option<(String, Option<String>)> = tx
                    .query_row(
                        "SELECT role, approval_status FROM users WHERE id = ?1",
                        [doctor_id.to_string()],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                match approval {
                    None => return Err(DoctorError::NotFound.into()),
                    Some((role, _)) if role != "doctor" => {
                        return Err(DoctorError::NotFound.into())
                    }
                    Some((_, approval)) if approval.as_deref() != Some("approved") => {
                        return Err(DoctorError::NotApproved.into())
                    }
                    Some(_) => {}
                }

                // Fixed-width HH:MM:SS strings compare correctly as text.
                let overlapping: bool = tx.query_row(
                    "SELECT COUNT(*) > 0 FROM availability_slots
                     WHERE doctor_id = ?1 AND slot_date = ?2
                       AND start_time < ?3 AND end_time > ?4",
                    params![
                        doctor_id.to_string(),
                        slot.date.format(DATE_FORMAT).to_string(),
                        slot.end_time.format(TIME_FORMAT).to_string(),
                        slot.start_time.format(TIME_FORMAT).to_string(),
                    ],
                    |row| row.get(0),
                )?;
                if overlapping {
                    return Err(DoctorError::SlotOverlap.into());
                }

                tx.execute(
                    "INSERT INTO availability_slots (id, doctor_id, slot_date, start_time, end_time, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        slot.id.to_string(),
                        doctor_id.to_string(),
                        slot.date.format(DATE_FORMAT).to_string(),
                        slot.start_time.format(TIME_FORMAT).to_string(),
                        slot.end_time.format(TIME_FORMAT).to_string(),
                        now,
                    ],
                )?;
                Ok(())
            })
            .map_err(DoctorError::from_db)?;

        info!("slot {} created for doctor {}", slot.id, doctor_id);
        Ok(slot)
    }

    /// Slots with no live appointment, ordered by date then start time.
    pub fn list_free_slots(&self, doctor_id: Uuid) -> Result<Vec<AvailabilitySlot>, DoctorError> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.id, s.doctor_id, s.slot_date, s.start_time, s.end_time
                     FROM availability_slots s
                     LEFT JOIN appointments a
                            ON a.slot_id = s.id AND a.status != 'cancelled'
                     WHERE s.doctor_id = ?1 AND a.id IS NULL
                     ORDER BY s.slot_date, s.start_time",
                )?;
                let rows = stmt.query_map([doctor_id.to_string()], |row| Ok(map_slot_row(row)))?;

                let mut slots = Vec::new();
                for row in rows {
                    slots.push(row??);
                }
                Ok(slots)
            })
            .map_err(DoctorError::from_db)
    }

    /// Owner/admin management view: every slot, booked or not.
    pub fn list_slots(
        &self,
        actor: &AuthUser,
        doctor_id: Uuid,
    ) -> Result<Vec<SlotWithStatus>, DoctorError> {
        if actor.id != doctor_id && !actor.is_admin() {
            return Err(DoctorError::NotOwner);
        }

        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.id, s.doctor_id, s.slot_date, s.start_time, s.end_time,
                            a.id IS NOT NULL AS is_booked
                     FROM availability_slots s
                     LEFT JOIN appointments a
                            ON a.slot_id = s.id AND a.status != 'cancelled'
                     WHERE s.doctor_id = ?1
                     ORDER BY s.slot_date, s.start_time",
                )?;
                let rows = stmt.query_map([doctor_id.to_string()], |row| {
                    let is_booked: bool = row.get(5)?;
                    Ok(map_slot_row(row).map(|slot| SlotWithStatus { slot, is_booked }))
                })?;

                let mut slots = Vec::new();
                for row in rows {
                    slots.push(row??);
                }
                Ok(slots)
            })
            .map_err(DoctorError::from_db)
    }

    /// Remove a slot. Fails for non-owners and for slots an active
    /// appointment still references.
    pub fn delete_slot(
        &self,
        actor: &AuthUser,
        doctor_id: Uuid,
        slot_id: Uuid,
    ) -> Result<(), DoctorError> {
        self.db
            .with_tx(|tx| {
                let owner: Option<String> = tx
                    .query_row(
                        "SELECT doctor_id FROM availability_slots WHERE id = ?1",
                        [slot_id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?;

                let Some(owner) = owner else {
                    return Err(DoctorError::SlotNotFound.into());
                };
                if owner != doctor_id.to_string() {
                    return Err(DoctorError::SlotNotFound.into());
                }
                if actor.id.to_string() != owner && !actor.is_admin() {
                    return Err(DoctorError::NotOwner.into());
                }

                if slot_has_active_appointment(tx, slot_id)? {
                    return Err(DoctorError::SlotBooked.into());
                }

                // Cancelled appointment history still references the slot
                // row; drop it first so the delete does not cascade live
                // data unexpectedly.
                tx.execute(
                    "DELETE FROM appointments WHERE slot_id = ?1 AND status = 'cancelled'",
                    [slot_id.to_string()],
                )?;
                tx.execute(
                    "DELETE FROM availability_slots WHERE id = ?1",
                    [slot_id.to_string()],
                )?;
                Ok(())
            })
            .map_err(DoctorError::from_db)?;

        debug!("slot {} deleted by {}", slot_id, actor.id);
        Ok(())
    }
}

fn slot_has_active_appointment(conn: &Connection, slot_id: Uuid) -> anyhow::Result<bool> {
    let active: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM appointments WHERE slot_id = ?1 AND status != 'cancelled'",
        [slot_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(active)
}

pub(crate) fn map_slot_row(row: &Row) -> anyhow::Result<AvailabilitySlot> {
    let id: String = row.get(0)?;
    let doctor_id: String = row.get(1)?;
    let date: String = row.get(2)?;
    let start_time: String = row.get(3)?;
    let end_time: String = row.get(4)?;

    Ok(AvailabilitySlot {
        id: Uuid::parse_str(&id)?,
        doctor_id: Uuid::parse_str(&doctor_id)?,
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT)?,
        start_time: NaiveTime::parse_from_str(&start_time, TIME_FORMAT)?,
        end_time: NaiveTime::parse_from_str(&end_time, TIME_FORMAT)?,
    })
}
