// src/auth/extract.rs

//! Role extractors.
//!
//! Each extractor validates the Bearer token and rejects with 401 when it is
//! missing or invalid, or with 403 when the role does not match. Browsers
//! cannot set headers on a WebSocket upgrade, so an `access_token` query
//! parameter is accepted as a fallback.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use super::jwt::{self, Claims, Role};
use crate::error::AppError;
use crate::models::DbId;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(header) = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
    params.remove("access_token")
}

fn claims(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let token = bearer_token(parts)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;
    jwt::validate(&token, &state.config.jwt)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

fn require(claims: &Claims, role: Role) -> Result<(), AppError> {
    if claims.role != role {
        tracing::debug!(sub = claims.sub, role = ?claims.role, wanted = ?role, "role mismatch");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Any signed-in caller, whatever the role.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: DbId,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims(parts, state)?;
        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CitizenUser {
    pub citizen_id: DbId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CitizenUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims(parts, state)?;
        require(&claims, Role::Citizen)?;
        Ok(CitizenUser {
            citizen_id: claims.sub,
        })
    }
}

/// A district admin whose district has been re-read from storage, so a
/// reassigned or deleted admin loses access without waiting for the token
/// to expire.
#[derive(Debug, Clone)]
pub struct DistrictAdmin {
    pub admin_id: DbId,
    pub district_name: String,
}

impl DistrictAdmin {
    pub async fn load(state: &AppState, admin_id: DbId) -> Result<Self, AppError> {
        let admin = state
            .store
            .admin_by_id(admin_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Admin account no longer exists".into()))?;
        Ok(DistrictAdmin {
            admin_id: admin.id,
            district_name: admin.district_name,
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for DistrictAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims(parts, state)?;
        require(&claims, Role::Admin)?;
        DistrictAdmin::load(state, claims.sub).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StateAdminUser {
    pub state_admin_id: DbId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for StateAdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims(parts, state)?;
        require(&claims, Role::StateAdmin)?;
        Ok(StateAdminUser {
            state_admin_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(req: Request<()>) -> Parts {
        req.into_parts().0
    }

    #[test]
    fn header_token_is_preferred() {
        let p = parts(
            Request::builder()
                .uri("/api/admin/reports/live?access_token=from-query")
                .header("authorization", "Bearer from-header")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&p).as_deref(), Some("from-header"));
    }

    #[test]
    fn query_token_is_a_fallback() {
        let p = parts(
            Request::builder()
                .uri("/api/admin/reports/live?x=1&access_token=abc.def")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&p).as_deref(), Some("abc.def"));
    }

    #[test]
    fn query_token_is_percent_decoded() {
        let p = parts(
            Request::builder()
                .uri("/api/admin/reports/live?access_token=abc%2Bdef%3D")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&p).as_deref(), Some("abc+def="));
    }

    #[test]
    fn non_bearer_header_yields_nothing() {
        let p = parts(
            Request::builder()
                .header("authorization", "Basic Zm9vOmJhcg==")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&p), None);
    }
}
