use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{Request, StatusCode},
    Json,
};
use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::appointment_routes;
use appointment_cell::handlers::{cancel_appointment, create_appointment, get_appointment, list_appointments};
use appointment_cell::models::CreateAppointmentRequest;
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

async fn mount_doctor_details(server: &MockServer, ids: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("in.({})", ids)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 2, "full_name": "User 2" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("user_id", format!("in.({})", ids)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user_id": 2, "specialization": "Cardiology" }
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn create_books_scheduled_appointment() {
    let server = MockServer::start().await;
    mount_user(&server, 2, "doctor").await;

    let when = Utc::now() + Duration::days(1);
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "user_id": 1, "doctor_id": 2, "status": "scheduled" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(10, 1, 2, &when.to_rfc3339(), "scheduled")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateAppointmentRequest { doctor_id: 2, datetime: when, notes: None };
    let (status, Json(body)) = create_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
        Json(request),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["id"], 10);
    assert_eq!(body["appointment"]["status"], "scheduled");
}

#[tokio::test]
async fn create_rejects_past_time_and_non_doctors() {
    let server = MockServer::start().await;
    mount_user(&server, 3, "patient").await;

    let past = CreateAppointmentRequest {
        doctor_id: 2,
        datetime: Utc::now() - Duration::hours(1),
        notes: None,
    };
    let result = create_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
        Json(past),
    )
    .await;
    assert_matches!(result, Err(AppError::BadRequest(_)));

    let not_a_doctor = CreateAppointmentRequest {
        doctor_id: 3,
        datetime: Utc::now() + Duration::days(1),
        notes: None,
    };
    let result = create_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
        Json(not_a_doctor),
    )
    .await;
    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn get_is_scoped_to_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.10"))
        .and(query_param("user_id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = get_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(9).to_user()),
        Path(10),
    )
    .await;

    assert_matches!(result, Err(AppError::NotFound(_)));
}

#[tokio::test]
async fn cancel_only_applies_to_scheduled_appointments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(10, 1, 2, "2024-01-10T08:00:00Z", "serviced")
        ])))
        .mount(&server)
        .await;

    let result = cancel_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
        Path(10),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn cancel_loses_to_concurrent_status_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(10, 1, 2, "2024-01-10T08:00:00Z", "scheduled")
        ])))
        .mount(&server)
        .await;
    // The status guard no longer matches: someone else moved it first.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let result = cancel_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
        Path(10),
    )
    .await;

    assert_matches!(result, Err(AppError::Conflict(_)));
}

#[tokio::test]
async fn routes_require_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(10, 1, 2, "2024-01-10T08:00:00Z", "appointed")
        ])))
        .mount(&server)
        .await;
    mount_doctor_details(&server, "2").await;

    let config = config_for(&server);
    let app = appointment_routes(config.clone());

    let anonymous = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let token = JwtTestUtils::create_test_token(&TestUser::patient(1), &config.jwt_secret, None);
    let authorized = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(authorized.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(authorized.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["appointments"][0]["appointment"]["status"], "serviced");
    assert_eq!(body["appointments"][0]["doctor"]["full_name"], "User 2");
}

#[tokio::test]
async fn appointments_are_returned_with_their_doctor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.10"))
        .and(query_param("user_id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(10, 1, 2, "2024-01-10T08:00:00Z", "scheduled")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("user_id", "eq.1"))
        .and(query_param("order", "datetime.asc,id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(10, 1, 2, "2024-01-10T08:00:00Z", "scheduled"),
            MockSupabaseResponses::appointment_row(11, 1, 5, "2024-01-11T08:00:00Z", "scheduled")
        ])))
        .mount(&server)
        .await;
    mount_doctor_details(&server, "2").await;
    mount_doctor_details(&server, "2,5").await;

    let Json(body) = get_appointment(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
        Path(10),
    )
    .await
    .unwrap();

    assert_eq!(body["appointment"]["appointment"]["id"], 10);
    assert_eq!(body["appointment"]["doctor"], json!({
        "id": 2,
        "full_name": "User 2",
        "specialization": "Cardiology"
    }));

    let Json(body) = list_appointments(
        State(config_for(&server)),
        Extension(TestUser::patient(1).to_user()),
    )
    .await
    .unwrap();

    assert_eq!(body["appointments"][0]["doctor"]["specialization"], "Cardiology");
    // Doctor 5 has no user row left: the appointment is still listed.
    assert_eq!(body["appointments"][1]["appointment"]["id"], 11);
    assert!(body["appointments"][1]["doctor"].is_null());
}
