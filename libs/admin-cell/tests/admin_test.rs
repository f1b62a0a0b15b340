use assert_matches::assert_matches;
use uuid::Uuid;

use admin_cell::models::AdminError;
use admin_cell::services::approval::DoctorApprovalService;
use admin_cell::services::users::UserAdminService;
use doctor_cell::models::DoctorSearchQuery;
use doctor_cell::services::doctor::DoctorService;
use shared_database::Db;
use shared_models::auth::{ApprovalStatus, Role};
use shared_utils::test_utils::{seed_user, TestUser};

fn no_filter() -> DoctorSearchQuery {
    DoctorSearchQuery {
        search: None,
        specialization: None,
    }
}

#[test]
fn approval_moves_a_doctor_into_the_catalogue() {
    let db = Db::open_in_memory().unwrap();
    let pending = TestUser::pending_doctor("pending@example.com");
    seed_user(&db, &pending);

    let approval = DoctorApprovalService::new(db.clone());
    let catalogue = DoctorService::new(db.clone());

    let waiting = approval.pending_doctors().unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].id, pending.id);
    assert_eq!(waiting[0].specialization, "General Medicine");

    assert!(catalogue.list_doctors(no_filter()).unwrap().is_empty());

    approval.approve(pending.id).unwrap();

    let listed = catalogue.list_doctors(no_filter()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, pending.id);
    assert!(approval.pending_doctors().unwrap().is_empty());
}

#[test]
fn rejection_keeps_a_doctor_out_of_the_catalogue() {
    let db = Db::open_in_memory().unwrap();
    let pending = TestUser::pending_doctor("pending@example.com");
    seed_user(&db, &pending);

    let approval = DoctorApprovalService::new(db.clone());
    approval.reject(pending.id).unwrap();

    assert!(DoctorService::new(db.clone())
        .list_doctors(no_filter())
        .unwrap()
        .is_empty());
    assert!(approval.pending_doctors().unwrap().is_empty());

    let record = UserAdminService::new(db.clone()).get_user(pending.id).unwrap();
    assert_eq!(record.approval_status, Some(ApprovalStatus::Rejected));
}

#[test]
fn approving_a_non_pending_doctor_is_a_state_error() {
    let db = Db::open_in_memory().unwrap();
    let approved = TestUser::doctor("approved@example.com");
    let patient = TestUser::patient("pat@example.com");
    seed_user(&db, &approved);
    seed_user(&db, &patient);

    let approval = DoctorApprovalService::new(db.clone());

    assert_matches!(approval.approve(approved.id), Err(AdminError::NotPending));
    assert_matches!(approval.approve(patient.id), Err(AdminError::DoctorNotFound));
    assert_matches!(approval.approve(Uuid::new_v4()), Err(AdminError::DoctorNotFound));
}

#[test]
fn role_change_runs_the_approval_workflow() {
    let db = Db::open_in_memory().unwrap();
    let admin = TestUser::admin("admin@example.com");
    let patient = TestUser::patient("pat@example.com");
    seed_user(&db, &admin);
    seed_user(&db, &patient);

    let users = UserAdminService::new(db.clone());

    let promoted = users
        .update_role(&admin.to_auth_user(), patient.id, Role::Doctor)
        .unwrap();
    assert_eq!(promoted.role, Role::Doctor);
    assert_eq!(promoted.approval_status, Some(ApprovalStatus::Pending));

    // The promoted user now sits in the approval queue.
    let waiting = DoctorApprovalService::new(db.clone()).pending_doctors().unwrap();
    assert_eq!(waiting.len(), 1);

    // Demoting clears the approval state again.
    let demoted = users
        .update_role(&admin.to_auth_user(), patient.id, Role::Patient)
        .unwrap();
    assert_eq!(demoted.role, Role::Patient);
    assert_eq!(demoted.approval_status, None);
}

#[test]
fn admins_cannot_modify_or_delete_themselves() {
    let db = Db::open_in_memory().unwrap();
    let admin = TestUser::admin("admin@example.com");
    seed_user(&db, &admin);

    let users = UserAdminService::new(db.clone());

    assert_matches!(
        users.update_role(&admin.to_auth_user(), admin.id, Role::Patient),
        Err(AdminError::SelfModification)
    );
    assert_matches!(
        users.delete_user(&admin.to_auth_user(), admin.id),
        Err(AdminError::SelfModification)
    );
}

#[test]
fn deleting_a_user_cascades_their_data() {
    let db = Db::open_in_memory().unwrap();
    let admin = TestUser::admin("admin@example.com");
    let doctor = TestUser::doctor("doc@example.com");
    seed_user(&db, &admin);
    seed_user(&db, &doctor);
    shared_utils::test_utils::seed_slot(&db, doctor.id, "2030-06-01", "09:00:00", "09:30:00");

    let users = UserAdminService::new(db.clone());
    users.delete_user(&admin.to_auth_user(), doctor.id).unwrap();

    assert_matches!(users.get_user(doctor.id), Err(AdminError::UserNotFound));

    let orphaned: i64 = db
        .with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM availability_slots WHERE doctor_id = ?1",
                [doctor.id.to_string()],
                |row| row.get(0),
            )?)
        })
        .unwrap();
    assert_eq!(orphaned, 0);

    assert_matches!(
        users.delete_user(&admin.to_auth_user(), doctor.id),
        Err(AdminError::UserNotFound)
    );
}

#[test]
fn user_listing_shows_every_account() {
    let db = Db::open_in_memory().unwrap();
    let admin = TestUser::admin("admin@example.com");
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");
    seed_user(&db, &admin);
    seed_user(&db, &doctor);
    seed_user(&db, &patient);

    let listed = UserAdminService::new(db.clone()).list_users().unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().any(|u| u.role == Role::Admin));
    assert!(listed.iter().any(|u| u.role == Role::Doctor));
    assert!(listed.iter().any(|u| u.role == Role::Patient));
}
