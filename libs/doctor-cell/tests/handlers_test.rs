use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{Request, StatusCode},
    Json,
};
use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::handlers::{create_diagnosis, create_prescription};
use doctor_cell::{doctor_routes, ChangeToDoctorRequest, CreateDiagnosisRequest, CreatePrescriptionRequest, DoctorError, DoctorProfileService};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn config_for(server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_supabase_url(&server.uri()).to_arc()
}

async fn mount_user(server: &MockServer, id: i64, role: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(id, role)
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn non_doctors_are_forbidden() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient(1), &config.jwt_secret, None);

    let response = doctor_routes(config)
        .oneshot(
            Request::builder()
                .uri("/appointments")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn doctor_lists_own_appointments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(5, 1, 2, "2024-01-10T08:00:00Z", "scheduled")
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::doctor(2), &config.jwt_secret, None);

    let response = doctor_routes(config)
        .oneshot(
            Request::builder()
                .uri("/appointments")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn diagnosis_is_recorded_for_existing_patient() {
    let server = MockServer::start().await;
    mount_user(&server, 1, "patient").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/diagnoses"))
        .and(body_partial_json(json!({ "patient_id": 1, "doctor_id": 2, "diagnosis": "Flu" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 9,
            "patient_id": 1,
            "doctor_id": 2,
            "diagnosis": "Flu",
            "date": "2024-01-10T08:00:00Z",
            "notes": null,
            "created_at": "2024-01-10T08:00:00Z",
            "updated_at": "2024-01-10T08:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateDiagnosisRequest {
        patient_id: 1,
        diagnosis: "Flu".to_string(),
        date: Utc::now(),
        notes: None,
    };
    let (status, Json(body)) = create_diagnosis(
        State(config_for(&server)),
        Extension(TestUser::doctor(2).to_user()),
        Json(request),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["diagnosis"]["id"], 9);
}

#[tokio::test]
async fn diagnosis_for_non_patient_is_rejected() {
    let server = MockServer::start().await;
    mount_user(&server, 3, "lab_technician").await;

    let request = CreateDiagnosisRequest {
        patient_id: 3,
        diagnosis: "Flu".to_string(),
        date: Utc::now(),
        notes: None,
    };
    let result = create_diagnosis(
        State(config_for(&server)),
        Extension(TestUser::doctor(2).to_user()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn prescription_dates_are_validated() {
    let server = MockServer::start().await;
    let start = Utc::now();

    let request = CreatePrescriptionRequest {
        patient_id: 1,
        medication: "Ibuprofen".to_string(),
        dosage: "200mg".to_string(),
        frequency: "twice daily".to_string(),
        start_date: start,
        end_date: Some(start - Duration::days(1)),
        notes: None,
    };
    let result = create_prescription(
        State(config_for(&server)),
        Extension(TestUser::doctor(2).to_user()),
        Json(request),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn failed_profile_creation_restores_previous_role() {
    let server = MockServer::start().await;
    mount_user(&server, 4, "patient").await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "role": "doctor" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(4, "doctor")
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "role": "patient" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(4, "patient")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = DoctorProfileService::new(&config_for(&server));
    let result = service
        .promote(4, ChangeToDoctorRequest {
            specialization: Some("Cardiology".to_string()),
            license_number: Some("LIC-4".to_string()),
            years_of_experience: None,
        })
        .await;

    assert_matches!(result, Err(DoctorError::Store(_)));
}
