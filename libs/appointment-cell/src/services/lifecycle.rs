// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use rusqlite::params;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::Db;
use shared_models::auth::AuthUser;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::booking::load_appointment;

/// The appointment state machine. This service is the sole writer of
/// `status`: every transition - a doctor completing a consultation, a
/// patient or admin cancelling - goes through `transition`.
pub struct AppointmentLifecycleService {
    db: Db,
}

impl AppointmentLifecycleService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Get all valid next statuses for a given current status.
    pub fn valid_transitions(&self, current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Booked => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Validate that a status transition is allowed.
    pub fn validate_status_transition(
        &self,
        current: &AppointmentStatus,
        new: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("validating status transition {} -> {}", current, new);

        if !self.valid_transitions(current).contains(new) {
            warn!("invalid status transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::InvalidTransition { from: *current });
        }

        Ok(())
    }

    /// Per-transition actor authority:
    /// completed - the owning doctor only;
    /// cancelled - the owning patient, the owning doctor, or an admin.
    pub fn authorize_transition(
        &self,
        actor: &AuthUser,
        appointment: &Appointment,
        new: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        let is_patient = actor.id == appointment.patient_id;
        let is_doctor = actor.id == appointment.doctor_id;

        if !is_patient && !is_doctor && !actor.is_admin() {
            return Err(AppointmentError::NotAuthorized);
        }

        match new {
            AppointmentStatus::Completed if !is_doctor => Err(AppointmentError::NotAuthorized),
            _ => Ok(()),
        }
    }

    /// Apply a transition. Authority and state validity are checked
    /// against the row read inside the same transaction that writes it,
    /// so two competing transitions serialize and the loser sees the
    /// terminal state.
    pub fn transition(
        &self,
        actor: &AuthUser,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let updated = self
            .db
            .with_tx(|tx| {
                let Some(appointment) = load_appointment(tx, appointment_id)? else {
                    return Err(AppointmentError::NotFound.into());
                };

                self.authorize_transition(actor, &appointment, &new_status)
                    .map_err(anyhow::Error::from)?;
                self.validate_status_transition(&appointment.status, &new_status)
                    .map_err(anyhow::Error::from)?;

                let now = Utc::now();
                tx.execute(
                    "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![
                        new_status.as_str(),
                        now.to_rfc3339(),
                        appointment_id.to_string(),
                    ],
                )?;

                Ok(Appointment {
                    status: new_status,
                    updated_at: now,
                    ..appointment
                })
            })
            .map_err(AppointmentError::from_db)?;

        info!(
            "appointment {} transitioned to {} by {}",
            appointment_id, new_status, actor.id
        );
        Ok(updated)
    }
}
