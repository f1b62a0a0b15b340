use assert_matches::assert_matches;

use auth_cell::models::{AuthError, LoginRequest, RegisterRequest};
use auth_cell::services::account::AccountService;
use shared_database::Db;
use shared_models::auth::{ApprovalStatus, Role};

fn service() -> AccountService {
    AccountService::new(Db::open_in_memory().expect("in-memory db"))
}

fn patient_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Alice Example".to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        role: None,
        specialization: None,
        qualifications: None,
        experience_years: None,
        consultation_fee: None,
        bio: None,
    }
}

fn doctor_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Dr. Bob".to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        role: Some(Role::Doctor),
        specialization: Some("Cardiology".to_string()),
        qualifications: Some(vec!["MBBS".to_string(), "MD".to_string()]),
        experience_years: Some(8),
        consultation_fee: Some(120.0),
        bio: None,
    }
}

#[test]
fn register_then_login_round_trips() {
    let service = service();

    let registered = service.register(patient_request("alice@example.com")).unwrap();
    assert_eq!(registered.role, Role::Patient);
    assert_eq!(registered.approval_status, None);
    assert_eq!(registered.email, "alice@example.com");

    let logged_in = service
        .login(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "secret123".to_string(),
        })
        .unwrap();
    assert_eq!(logged_in.id, registered.id);
}

#[test]
fn email_is_normalized_for_login() {
    let service = service();
    service.register(patient_request("Alice@Example.COM")).unwrap();

    let logged_in = service.login(LoginRequest {
        email: "alice@example.com".to_string(),
        password: "secret123".to_string(),
    });
    assert!(logged_in.is_ok());
}

#[test]
fn duplicate_email_is_a_conflict() {
    let service = service();
    service.register(patient_request("dup@example.com")).unwrap();

    let err = service
        .register(patient_request("dup@example.com"))
        .unwrap_err();
    assert_matches!(err, AuthError::EmailTaken);
}

#[test]
fn wrong_password_and_unknown_email_look_identical() {
    let service = service();
    service.register(patient_request("alice@example.com")).unwrap();

    let wrong_password = service
        .login(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "not-the-password".to_string(),
        })
        .unwrap_err();
    let unknown_email = service
        .login(LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "secret123".to_string(),
        })
        .unwrap_err();

    assert_matches!(wrong_password, AuthError::InvalidCredentials);
    assert_matches!(unknown_email, AuthError::InvalidCredentials);
}

#[test]
fn doctor_registration_starts_pending() {
    let service = service();
    let doctor = service.register(doctor_request("doc@example.com")).unwrap();

    assert_eq!(doctor.role, Role::Doctor);
    assert_eq!(doctor.approval_status, Some(ApprovalStatus::Pending));

    // Fresh fetch shows the same state.
    let fetched = service.fetch_user(doctor.id).unwrap();
    assert_eq!(fetched.approval_status, Some(ApprovalStatus::Pending));
}

#[test]
fn doctor_registration_requires_profile_fields() {
    let service = service();

    let mut missing_specialization = doctor_request("doc@example.com");
    missing_specialization.specialization = None;
    assert_matches!(
        service.register(missing_specialization).unwrap_err(),
        AuthError::Validation(_)
    );

    let mut missing_qualifications = doctor_request("doc@example.com");
    missing_qualifications.qualifications = Some(vec![]);
    assert_matches!(
        service.register(missing_qualifications).unwrap_err(),
        AuthError::Validation(_)
    );

    let mut missing_experience = doctor_request("doc@example.com");
    missing_experience.experience_years = None;
    assert_matches!(
        service.register(missing_experience).unwrap_err(),
        AuthError::Validation(_)
    );
}

#[test]
fn weak_password_and_bad_email_are_rejected() {
    let service = service();

    let mut weak = patient_request("alice@example.com");
    weak.password = "short".to_string();
    assert_matches!(service.register(weak).unwrap_err(), AuthError::Validation(_));

    let mut bad_email = patient_request("not-an-email");
    bad_email.email = "not-an-email".to_string();
    assert_matches!(
        service.register(bad_email).unwrap_err(),
        AuthError::Validation(_)
    );
}
