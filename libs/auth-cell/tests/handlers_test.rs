use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    Json,
};
use assert_matches::assert_matches;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use auth_cell::handlers::{signin, signup};
use auth_cell::models::{SigninRequest, SignupRequest};
use auth_cell::{auth_routes, PasswordService};
use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn config_for(server: &MockServer) -> Arc<AppConfig> {
    TestConfig::with_supabase_url(&server.uri()).to_arc()
}

fn signup_request() -> SignupRequest {
    SignupRequest {
        username: "user1".to_string(),
        email: "user1@example.com".to_string(),
        password: "long-enough-password".to_string(),
        full_name: Some("User 1".to_string()),
        role: None,
        date_of_birth: None,
        phone_number: None,
        address: None,
    }
}

fn stored_user(id: i64, password: &str) -> Value {
    let mut row = MockSupabaseResponses::user_row(id, "patient");
    row["hashed_password"] = json!(PasswordService::hash_password(password).unwrap());
    row
}

#[tokio::test]
async fn signup_creates_user_and_returns_valid_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.user1@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_row(1, "patient")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let (status, Json(response)) = signup(State(config.clone()), Json(signup_request()))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response.user.id, 1);

    let identity = validate_token(&response.token, &config.jwt_secret).unwrap();
    assert_eq!(identity.id, 1);
    assert_eq!(identity.role, Role::Patient);

    let body = serde_json::to_value(&response).unwrap();
    assert!(body["user"].get("hashed_password").is_none());
}

#[tokio::test]
async fn signup_rejects_existing_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(1, "patient")
        ])))
        .mount(&server)
        .await;

    let result = signup(State(config_for(&server)), Json(signup_request())).await;

    assert_matches!(result, Err(AppError::BadRequest(msg)) if msg == "User already exists");
}

#[tokio::test]
async fn signup_rejects_invalid_input_without_touching_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let request = SignupRequest {
        password: "short".to_string(),
        ..signup_request()
    };
    let result = signup(State(config_for(&server)), Json(request)).await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn signin_accepts_correct_password() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored_user(4, "hunter2hunter2")])))
        .mount(&server)
        .await;

    let request = SigninRequest {
        email: "user4@example.com".to_string(),
        password: "hunter2hunter2".to_string(),
    };
    let Json(response) = signin(State(config_for(&server)), Json(request)).await.unwrap();

    assert_eq!(response.user.id, 4);
    assert!(!response.token.is_empty());
}

#[tokio::test]
async fn signin_rejects_wrong_password_and_unknown_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.user4@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stored_user(4, "hunter2hunter2")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.ghost@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = config_for(&server);

    let wrong = SigninRequest {
        email: "user4@example.com".to_string(),
        password: "not-the-password".to_string(),
    };
    assert_matches!(
        signin(State(config.clone()), Json(wrong)).await,
        Err(AppError::Auth(msg)) if msg == "Invalid credentials"
    );

    let unknown = SigninRequest {
        email: "ghost@example.com".to_string(),
        password: "whatever-password".to_string(),
    };
    assert_matches!(signin(State(config), Json(unknown)).await, Err(AppError::Auth(_)));
}

#[tokio::test]
async fn me_requires_token_and_returns_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_row(8, "doctor")
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let app = auth_routes(config.clone());

    let anonymous = app
        .clone()
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let token = JwtTestUtils::create_test_token(&TestUser::doctor(8), &config.jwt_secret, Some(1));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/me")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["user"]["id"], 8);
    assert_eq!(body["user"]["role"], "doctor");
}
