use assert_matches::assert_matches;
use chrono::{Duration, NaiveTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use doctor_cell::models::{CreateSlotRequest, DoctorError, DoctorSearchQuery};
use doctor_cell::services::availability::AvailabilityService;
use doctor_cell::services::doctor::DoctorService;
use shared_database::Db;
use shared_utils::test_utils::{seed_slot, seed_user, TestUser};

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap()
}

fn tomorrow() -> chrono::NaiveDate {
    Utc::now().date_naive() + Duration::days(1)
}

fn slot_request(start: &str, end: &str) -> CreateSlotRequest {
    CreateSlotRequest {
        date: tomorrow(),
        start_time: time(start),
        end_time: time(end),
    }
}

fn book_slot(db: &Db, slot_id: Uuid, doctor_id: Uuid, patient_id: Uuid) {
    let now = Utc::now().to_rfc3339();
    db.with_tx(|tx| {
        tx.execute(
            "INSERT INTO appointments (id, slot_id, patient_id, doctor_id, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'booked', ?5, ?5)",
            params![
                Uuid::new_v4().to_string(),
                slot_id.to_string(),
                patient_id.to_string(),
                doctor_id.to_string(),
                now,
            ],
        )?;
        Ok(())
    })
    .unwrap();
}

#[test]
fn doctor_creates_and_lists_own_slots() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &doctor);

    let service = AvailabilityService::new(db.clone());
    let actor = doctor.to_auth_user();

    let slot = service
        .create_slot(&actor, doctor.id, slot_request("09:00:00", "09:30:00"))
        .unwrap();
    assert_eq!(slot.doctor_id, doctor.id);

    let free = service.list_free_slots(doctor.id).unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].id, slot.id);
}

#[test]
fn end_before_start_is_rejected() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &doctor);

    let service = AvailabilityService::new(db.clone());
    let err = service
        .create_slot(
            &doctor.to_auth_user(),
            doctor.id,
            slot_request("10:00:00", "09:00:00"),
        )
        .unwrap_err();
    assert_matches!(err, DoctorError::Validation(_));

    // Zero-length windows are equally invalid.
    let err = service
        .create_slot(
            &doctor.to_auth_user(),
            doctor.id,
            slot_request("10:00:00", "10:00:00"),
        )
        .unwrap_err();
    assert_matches!(err, DoctorError::Validation(_));
}

#[test]
fn past_date_is_rejected() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &doctor);

    let request = CreateSlotRequest {
        date: Utc::now().date_naive() - Duration::days(1),
        start_time: time("09:00:00"),
        end_time: time("09:30:00"),
    };
    let err = AvailabilityService::new(db.clone())
        .create_slot(&doctor.to_auth_user(), doctor.id, request)
        .unwrap_err();
    assert_matches!(err, DoctorError::Validation(_));
}

#[test]
fn overlapping_slot_is_a_conflict() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &doctor);

    let service = AvailabilityService::new(db.clone());
    let actor = doctor.to_auth_user();

    service
        .create_slot(&actor, doctor.id, slot_request("09:00:00", "10:00:00"))
        .unwrap();

    let err = service
        .create_slot(&actor, doctor.id, slot_request("09:30:00", "10:30:00"))
        .unwrap_err();
    assert_matches!(err, DoctorError::SlotOverlap);

    // Back-to-back windows do not overlap.
    service
        .create_slot(&actor, doctor.id, slot_request("10:00:00", "11:00:00"))
        .unwrap();
}

#[test]
fn unapproved_doctor_cannot_publish_slots() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::pending_doctor("pending@example.com");
    seed_user(&db, &doctor);

    let err = AvailabilityService::new(db.clone())
        .create_slot(
            &doctor.to_auth_user(),
            doctor.id,
            slot_request("09:00:00", "09:30:00"),
        )
        .unwrap_err();
    assert_matches!(err, DoctorError::NotApproved);
}

#[test]
fn free_slot_listing_is_ordered_and_skips_booked() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    seed_user(&db, &doctor);
    seed_user(&db, &patient);

    let date_late = (tomorrow() + Duration::days(1)).format("%Y-%m-%d").to_string();
    let date_early = tomorrow().format("%Y-%m-%d").to_string();

    let late = seed_slot(&db, doctor.id, &date_late, "09:00:00", "09:30:00");
    let afternoon = seed_slot(&db, doctor.id, &date_early, "14:00:00", "14:30:00");
    let morning = seed_slot(&db, doctor.id, &date_early, "09:00:00", "09:30:00");

    book_slot(&db, afternoon, doctor.id, patient.id);

    let service = AvailabilityService::new(db.clone());
    let free = service.list_free_slots(doctor.id).unwrap();
    let ids: Vec<_> = free.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![morning, late]);

    // The management view still shows the booked window.
    let all = service.list_slots(&doctor.to_auth_user(), doctor.id).unwrap();
    assert_eq!(all.len(), 3);
    let booked: Vec<_> = all.iter().filter(|s| s.is_booked).collect();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].slot.id, afternoon);
}

#[test]
fn delete_requires_ownership() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    let other = TestUser::doctor("other@example.com");
    let admin = TestUser::admin("admin@example.com");
    seed_user(&db, &doctor);
    seed_user(&db, &other);
    seed_user(&db, &admin);

    let date = tomorrow().format("%Y-%m-%d").to_string();
    let slot = seed_slot(&db, doctor.id, &date, "09:00:00", "09:30:00");

    let service = AvailabilityService::new(db.clone());

    let err = service
        .delete_slot(&other.to_auth_user(), doctor.id, slot)
        .unwrap_err();
    assert_matches!(err, DoctorError::NotOwner);

    // Admins may clean up on a doctor's behalf.
    service
        .delete_slot(&admin.to_auth_user(), doctor.id, slot)
        .unwrap();
    assert!(service.list_free_slots(doctor.id).unwrap().is_empty());
}

#[test]
fn booked_slot_cannot_be_deleted() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    seed_user(&db, &doctor);
    seed_user(&db, &patient);

    let date = tomorrow().format("%Y-%m-%d").to_string();
    let slot = seed_slot(&db, doctor.id, &date, "09:00:00", "09:30:00");
    book_slot(&db, slot, doctor.id, patient.id);

    let err = AvailabilityService::new(db.clone())
        .delete_slot(&doctor.to_auth_user(), doctor.id, slot)
        .unwrap_err();
    assert_matches!(err, DoctorError::SlotBooked);
}

#[test]
fn unknown_slot_is_not_found() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &doctor);

    let err = AvailabilityService::new(db.clone())
        .delete_slot(&doctor.to_auth_user(), doctor.id, Uuid::new_v4())
        .unwrap_err();
    assert_matches!(err, DoctorError::SlotNotFound);
}

#[test]
fn catalogue_only_lists_approved_doctors() {
    let db = Db::open_in_memory().unwrap();
    let approved = TestUser::doctor("approved@example.com");
    let pending = TestUser::pending_doctor("pending@example.com");
    seed_user(&db, &approved);
    seed_user(&db, &pending);

    let service = DoctorService::new(db.clone());

    let all = service
        .list_doctors(DoctorSearchQuery {
            search: None,
            specialization: None,
        })
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, approved.id);

    // A search term that matches the pending doctor's name still
    // cannot surface them.
    let searched = service
        .list_doctors(DoctorSearchQuery {
            search: Some("Test Doctor".to_string()),
            specialization: None,
        })
        .unwrap();
    assert!(searched.iter().all(|d| d.id == approved.id));

    assert_matches!(service.get_doctor(pending.id), Err(DoctorError::NotFound));
    assert!(service.get_doctor(approved.id).is_ok());
}

#[test]
fn catalogue_filters_by_specialization() {
    let db = Db::open_in_memory().unwrap();
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &doctor); // seeded with General Medicine

    let service = DoctorService::new(db.clone());

    let matching = service
        .list_doctors(DoctorSearchQuery {
            search: None,
            specialization: Some("general medicine".to_string()),
        })
        .unwrap();
    assert_eq!(matching.len(), 1);

    let non_matching = service
        .list_doctors(DoctorSearchQuery {
            search: None,
            specialization: Some("Dermatology".to_string()),
        })
        .unwrap();
    assert!(non_matching.is_empty());
}
