// src/routes/auth.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ValidJson;
use crate::auth::jwt::{self, Claims, Role};
use crate::auth::password;
use crate::error::{AppError, AppResult};
use crate::models::{Admin, AdminRole, Citizen, DbId, NewAdmin, NewCitizen, NewStateAdmin, StateAdmin};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CitizenRegisterBody {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 6, max = 20, message = "A valid phone number is required."))]
    pub phone: String,
    #[validate(length(max = 128, message = "Password is too long."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CitizenLoginBody {
    #[validate(length(min = 1, message = "Phone is required."))]
    pub phone: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegisterBody {
    #[validate(length(min = 1, max = 100, message = "Full name is required."))]
    pub full_name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(max = 128, message = "Password is too long."))]
    pub password: String,
    #[serde(default)]
    pub role: AdminRole,
    pub district_id: DbId,
    pub secret: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StateAdminRegisterBody {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(max = 128, message = "Password is too long."))]
    pub password: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StaffLoginBody {
    #[validate(length(min = 1, message = "Email is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse<U> {
    pub token: String,
    pub role: Role,
    pub user: U,
}

fn invalid_credentials() -> AppError {
    AppError::validation("Invalid credentials")
}

fn check_password(password: &str) -> AppResult<()> {
    if !password::is_long_enough(password) {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters.",
            password::MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// argon2 is deliberately slow; keep it off the async workers.
async fn hash(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

async fn verify(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

fn token(claims: &Claims, state: &AppState) -> AppResult<String> {
    jwt::issue(claims, &state.config.jwt).map_err(AppError::internal)
}

pub async fn register_citizen(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CitizenRegisterBody>,
) -> AppResult<(StatusCode, Json<Citizen>)> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("Name is required."));
    }
    check_password(&body.password)?;
    let citizen = state
        .store
        .create_citizen(NewCitizen {
            name,
            phone: body.phone.trim().to_string(),
            password_hash: hash(body.password).await?,
        })
        .await?;
    tracing::info!(citizen_id = citizen.id, "citizen registered");
    Ok((StatusCode::CREATED, Json(citizen)))
}

pub async fn login_citizen(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CitizenLoginBody>,
) -> AppResult<Json<LoginResponse<Citizen>>> {
    let citizen = state
        .store
        .citizen_by_phone(body.phone.trim())
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify(body.password, citizen.password_hash.clone()).await? {
        return Err(invalid_credentials());
    }

    let claims = Claims::new(citizen.id, Role::Citizen, state.config.jwt.expiry_hours);
    Ok(Json(LoginResponse {
        token: token(&claims, &state)?,
        role: Role::Citizen,
        user: citizen,
    }))
}

/// District admins prove membership with the district's registration key.
pub async fn register_admin(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AdminRegisterBody>,
) -> AppResult<(StatusCode, Json<Admin>)> {
    check_password(&body.password)?;
    let district = state
        .store
        .district_by_id(body.district_id)
        .await?
        .ok_or_else(|| AppError::not_found("District not found"))?;
    if district.secret_key != body.secret {
        tracing::warn!(district_id = district.id, "admin registration with wrong district key");
        return Err(AppError::Forbidden);
    }

    let admin = state
        .store
        .create_admin(NewAdmin {
            name: body.full_name.trim().to_string(),
            email: normalize_email(&body.email),
            password_hash: hash(body.password).await?,
            role: body.role,
            district_id: district.id,
        })
        .await?;
    tracing::info!(admin_id = admin.id, district = %admin.district_name, "admin registered");
    Ok((StatusCode::CREATED, Json(admin)))
}

pub async fn register_state_admin(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<StateAdminRegisterBody>,
) -> AppResult<(StatusCode, Json<StateAdmin>)> {
    check_password(&body.password)?;
    if body.secret_key != state.config.state_admin_secret {
        tracing::warn!("state admin registration with wrong key");
        return Err(AppError::Forbidden);
    }

    let admin = state
        .store
        .create_state_admin(NewStateAdmin {
            name: body.name.trim().to_string(),
            email: normalize_email(&body.email),
            password_hash: hash(body.password).await?,
        })
        .await?;
    tracing::info!(state_admin_id = admin.id, "state admin registered");
    Ok((StatusCode::CREATED, Json(admin)))
}

/// Shared login for both admin tiers: district admins first, then state admins.
pub async fn login_staff(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<StaffLoginBody>,
) -> AppResult<Json<LoginResponse<serde_json::Value>>> {
    let email = normalize_email(&body.email);
    let expiry = state.config.jwt.expiry_hours;

    if let Some(admin) = state.store.admin_by_email(&email).await? {
        if !verify(body.password, admin.password_hash.clone()).await? {
            return Err(invalid_credentials());
        }
        let claims = Claims::new(admin.id, Role::Admin, expiry)
            .with_district(admin.district_id, admin.district_name.clone());
        return Ok(Json(LoginResponse {
            token: token(&claims, &state)?,
            role: Role::Admin,
            user: serde_json::to_value(&admin).map_err(AppError::internal)?,
        }));
    }

    if let Some(admin) = state.store.state_admin_by_email(&email).await? {
        if !verify(body.password, admin.password_hash.clone()).await? {
            return Err(invalid_credentials());
        }
        let claims = Claims::new(admin.id, Role::StateAdmin, expiry);
        return Ok(Json(LoginResponse {
            token: token(&claims, &state)?,
            role: Role::StateAdmin,
            user: serde_json::to_value(&admin).map_err(AppError::internal)?,
        }));
    }

    Err(invalid_credentials())
}
