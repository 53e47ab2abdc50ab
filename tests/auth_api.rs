//! HTTP-level tests for registration, login, role enforcement and
//! reference data.

mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp, STATE_ADMIN_SECRET};
use nagarseva_api::auth::jwt;
use nagarseva_api::auth::Role;
use nagarseva_api::store::Store;
use serde_json::json;

async fn ranchi_id(app: &TestApp) -> i64 {
    app.store
        .districts()
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.name == "Ranchi")
        .unwrap()
        .id
}

#[tokio::test]
async fn citizen_register_then_login() {
    let app = TestApp::new().await;
    let body = json!({ "name": "Asha Devi", "phone": "9876543210", "password": "secret123" });

    let response = app.post_json("/api/auth/citizen/register", None, body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let citizen = body_json(response).await;
    assert_eq!(citizen["points"], 0);
    assert!(citizen.get("password_hash").is_none());

    let response = app.post_json("/api/auth/citizen/register", None, body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .post_json(
            "/api/auth/citizen/login",
            None,
            json!({ "phone": "9876543210", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_eq!(login["role"], "citizen");
    let claims = jwt::validate(login["token"].as_str().unwrap(), &app.config.jwt).unwrap();
    assert_eq!(claims.role, Role::Citizen);
    assert_eq!(json!(claims.sub), citizen["id"]);
}

#[tokio::test]
async fn citizen_login_with_wrong_password_fails() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/auth/citizen/register",
        None,
        json!({ "name": "Ravi", "phone": "9876500000", "password": "secret123" }),
    )
    .await;

    let response = app
        .post_json(
            "/api/auth/citizen/login",
            None,
            json!({ "phone": "9876500000", "password": "nope-nope" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid credentials");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post_json(
            "/api/auth/citizen/register",
            None,
            json!({ "name": "Ravi", "phone": "9876500001", "password": "abc" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Password must be at least 6 characters."
    );
}

#[tokio::test]
async fn admin_register_needs_district_key() {
    let app = TestApp::new().await;
    let district_id = ranchi_id(&app).await;
    let mut body = json!({
        "fullName": "Ranchi Officer",
        "email": "Officer@Ranchi.gov.in",
        "password": "secret123",
        "role": "department_admin",
        "districtId": district_id,
        "secret": "WRONG_KEY"
    });

    let response = app.post_json("/api/auth/register", None, body.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    body["secret"] = json!("RANCHI_ADMIN_KEY");
    let response = app.post_json("/api/auth/register", None, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let admin = body_json(response).await;
    assert_eq!(admin["email"], "officer@ranchi.gov.in");
    assert_eq!(admin["role"], "department");
    assert_eq!(admin["district_name"], "Ranchi");

    let response = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "officer@ranchi.gov.in", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_eq!(login["role"], "admin");
    let claims = jwt::validate(login["token"].as_str().unwrap(), &app.config.jwt).unwrap();
    assert_eq!(claims.district_id, Some(district_id));
    assert_eq!(claims.district_name.as_deref(), Some("Ranchi"));
}

#[tokio::test]
async fn state_admin_register_and_login() {
    let app = TestApp::new().await;
    let body = json!({
        "name": "State Desk",
        "email": "desk@jharkhand.gov.in",
        "password": "secret123",
        "secretKey": "guess"
    });
    let response = app.post_json("/api/auth/state-admin/register", None, body.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut body = body;
    body["secretKey"] = json!(STATE_ADMIN_SECRET);
    let response = app.post_json("/api/auth/state-admin/register", None, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "desk@jharkhand.gov.in", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_eq!(login["role"], "state_admin");

    let token = login["token"].as_str().unwrap().to_string();
    let response = app.get("/api/state-admin/escalated-reports", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_staff_login_is_invalid_credentials() {
    let app = TestApp::new().await;
    let response = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "ghost@nowhere.in", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = TestApp::new().await;
    let response = app.get("/api/citizen/my-reports", Some("not.a.jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reference_data_is_public_and_hides_keys() {
    let app = TestApp::new().await;

    let departments = body_json(app.get("/api/departments", None).await).await;
    assert_eq!(departments.as_array().unwrap().len(), 10);

    let districts = body_json(app.get("/api/districts", None).await).await;
    let districts = districts.as_array().unwrap();
    assert_eq!(districts.len(), 3);
    assert!(districts.iter().all(|d| d.get("secret_key").is_none()));
}

#[tokio::test]
async fn push_token_registration() {
    let app = TestApp::new().await;
    let (citizen_id, token) = app.citizen("9000000100").await;

    let response = app
        .put_json(
            "/api/citizen/push-token",
            Some(&token),
            json!({ "token": "ExponentPushToken[xyz]" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        app.store.citizen(citizen_id).await.unwrap().push_token.as_deref(),
        Some("ExponentPushToken[xyz]")
    );
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
