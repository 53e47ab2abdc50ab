#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use nagarseva_api::auth::jwt::{self, Claims, JwtConfig, Role};
use nagarseva_api::config::Config;
use nagarseva_api::models::{AdminRole, DbId, NewAdmin, NewCitizen};
use nagarseva_api::routes;
use nagarseva_api::state::AppState;
use nagarseva_api::store::{MemoryStore, Store};

pub const STATE_ADMIN_SECRET: &str = "state-secret-for-tests";
pub const PLACEHOLDER: &str = "https://placeholder.test/none.png";
pub const REWARD_POINTS: i32 = 10;

/// Config with safe defaults. No database is ever contacted.
pub fn test_config() -> Config {
    Config {
        port: 0,
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        db_statement_timeout_ms: 1000,
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            expiry_hours: 1,
        },
        state_admin_secret: STATE_ADMIN_SECRET.to_string(),
        report_rate_limit: 1000,
        report_rate_window_secs: 3600,
        push_api_url: None,
        placeholder_image_url: PLACEHOLDER.to_string(),
        resolution_reward_points: REWARD_POINTS,
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    pub config: Config,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Full router over a seeded in-memory store, same layers as production.
    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::seeded().await);
        let state = AppState::new(store.clone(), config.clone());
        Self {
            store,
            router: routes::router(state),
            config,
        }
    }

    pub fn token(&self, claims: &Claims) -> String {
        jwt::issue(claims, &self.config.jwt).expect("issue token")
    }

    pub async fn citizen(&self, phone: &str) -> (DbId, String) {
        let citizen = self
            .store
            .create_citizen(NewCitizen {
                name: "Test Citizen".into(),
                phone: phone.into(),
                password_hash: "unused".into(),
            })
            .await
            .expect("create citizen");
        let token = self.token(&Claims::new(citizen.id, Role::Citizen, 1));
        (citizen.id, token)
    }

    pub async fn district_admin(&self, district: &str) -> (DbId, String) {
        let district = self
            .store
            .districts()
            .await
            .unwrap()
            .into_iter()
            .find(|d| d.name == district)
            .expect("seeded district");
        let admin = self
            .store
            .create_admin(NewAdmin {
                name: format!("{} Admin", district.name),
                email: format!("admin@{}.test", district.name.to_lowercase()),
                password_hash: "unused".into(),
                role: AdminRole::General,
                district_id: district.id,
            })
            .await
            .expect("create admin");
        let claims = Claims::new(admin.id, Role::Admin, 1).with_district(district.id, district.name);
        (admin.id, self.token(&claims))
    }

    pub fn state_admin_token(&self) -> String {
        self.token(&Claims::new(1, Role::StateAdmin, 1))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: serde_json::Value) -> Response<Body> {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: serde_json::Value) -> Response<Body> {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

/// Lands in Ranchi, Ward 12.
pub fn pothole() -> serde_json::Value {
    serde_json::json!({
        "problem": "Pothole",
        "description": "Deep pothole near the bus stand",
        "latitude": 23.3569,
        "longitude": 85.3340,
        "department": "Engineering / Roads Department"
    })
}
