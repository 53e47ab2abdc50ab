// src/routes/mod.rs

use std::time::Duration;

use axum::extract::{FromRequest, Request};
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;
use crate::rate_limit;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod citizen;
pub mod health;
pub mod reference;
pub mod reports;
pub mod state_admin;

pub fn router(state: AppState) -> Router {
    // Very permissive CORS: the three dashboards are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let submit = post(citizen::submit_report).route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::limit_submissions,
    ));

    Router::new()
        // health
        .route("/health", get(health::health))
        // auth
        .route("/api/auth/citizen/register", post(auth::register_citizen))
        .route("/api/auth/citizen/login", post(auth::login_citizen))
        .route("/api/auth/register", post(auth::register_admin))
        .route("/api/auth/state-admin/register", post(auth::register_state_admin))
        .route("/api/auth/login", post(auth::login_staff))
        // reference data
        .route("/api/departments", get(reference::list_departments))
        .route("/api/districts", get(reference::list_districts))
        // citizen
        .route("/api/reports", submit)
        .route("/api/reports/:id", get(reports::get_report))
        .route("/api/citizen/my-reports", get(citizen::my_reports))
        .route("/api/citizen/push-token", put(citizen::set_push_token))
        // district admin
        .route("/api/admin/reports", get(admin::list_reports))
        .route("/api/admin/reports/live", get(admin::live_reports))
        .route("/api/admin/reports/:id", put(admin::update_report))
        // state admin
        .route(
            "/api/state-admin/escalated-reports",
            get(state_admin::escalated_reports),
        )
        .route("/api/state-admin/analytics", get(state_admin::analytics))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `Json<T>` that answers malformed bodies and failed `validator` rules with
/// a 400 `{"message": ...}` instead of axum's plain-text 422.
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Validation(first_message(&errors)))?;
        Ok(ValidJson(value))
    }
}

fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
