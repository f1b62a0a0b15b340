use anyhow::Context;
use rusqlite::Connection;

/// Schema is embedded so the binary is self-contained; every statement
/// is idempotent and the whole batch runs at startup.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE,
    password_hash   TEXT NOT NULL,
    role            TEXT NOT NULL DEFAULT 'patient',
    approval_status TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS doctor_profiles (
    user_id          TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    specialization   TEXT NOT NULL,
    qualifications   TEXT NOT NULL DEFAULT '[]',
    experience_years INTEGER NOT NULL DEFAULT 0,
    consultation_fee REAL,
    bio              TEXT,
    image_url        TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS availability_slots (
    id         TEXT PRIMARY KEY,
    doctor_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    slot_date  TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time   TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_slots_doctor_date
    ON availability_slots(doctor_id, slot_date, start_time);

CREATE TABLE IF NOT EXISTS appointments (
    id         TEXT PRIMARY KEY,
    slot_id    TEXT NOT NULL REFERENCES availability_slots(id) ON DELETE CASCADE,
    patient_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    doctor_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    status     TEXT NOT NULL DEFAULT 'booked',
    reason     TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- At most one live appointment per slot; a cancelled row frees the
-- slot for rebooking. This is the authoritative double-booking guard.
CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot_active
    ON appointments(slot_id) WHERE status != 'cancelled';

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments(doctor_id);
";

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(SCHEMA)
        .context("failed to apply schema")?;

    tracing::debug!("database schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_twice() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn active_slot_index_rejects_second_live_appointment() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute_batch(
            "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
             VALUES ('d1', 'Doc', 'doc@x.com', 'h', 'doctor', '2024-01-01', '2024-01-01'),
                    ('p1', 'Pat', 'pat@x.com', 'h', 'patient', '2024-01-01', '2024-01-01'),
                    ('p2', 'Pat2', 'pat2@x.com', 'h', 'patient', '2024-01-01', '2024-01-01');
             INSERT INTO availability_slots (id, doctor_id, slot_date, start_time, end_time, created_at)
             VALUES ('s1', 'd1', '2030-06-01', '09:00:00', '09:30:00', '2024-01-01');
             INSERT INTO appointments (id, slot_id, patient_id, doctor_id, status, created_at, updated_at)
             VALUES ('a1', 's1', 'p1', 'd1', 'booked', '2024-01-01', '2024-01-01');",
        )
        .unwrap();

        let second = conn.execute(
            "INSERT INTO appointments (id, slot_id, patient_id, doctor_id, status, created_at, updated_at)
             VALUES ('a2', 's1', 'p2', 'd1', 'booked', '2024-01-01', '2024-01-01')",
            [],
        );
        assert!(second.is_err());

        // A cancelled row does not hold the slot.
        conn.execute("UPDATE appointments SET status = 'cancelled' WHERE id = 'a1'", [])
            .unwrap();
        conn.execute(
            "INSERT INTO appointments (id, slot_id, patient_id, doctor_id, status, created_at, updated_at)
             VALUES ('a3', 's1', 'p2', 'd1', 'booked', '2024-01-01', '2024-01-01')",
            [],
        )
        .unwrap();
    }
}
