// src/auth/jwt.rs

// District admins carry their district in the token for display only;
// authorization re-reads it from storage in `extract::DistrictAdmin`.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::DbId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Admin,
    StateAdmin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: DbId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

impl Claims {
    pub fn new(sub: DbId, role: Role, expiry_hours: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub,
            role,
            district_id: None,
            district_name: None,
            exp: now + expiry_hours * 3600,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_district(mut self, id: DbId, name: impl Into<String>) -> Self {
        self.district_id = Some(id);
        self.district_name = Some(name.into());
        self
    }
}

pub fn issue(claims: &Claims, config: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

pub fn validate(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            expiry_hours: 24,
        }
    }

    #[test]
    fn admin_token_round_trips_district() {
        let cfg = config("test-secret-long-enough-for-hmac");
        let claims = Claims::new(7, Role::Admin, 24).with_district(3, "Ranchi");
        let token = issue(&claims, &cfg).expect("issue");

        let decoded = validate(&token, &cfg).expect("validate");
        assert_eq!(decoded.sub, 7);
        assert_eq!(decoded.role, Role::Admin);
        assert_eq!(decoded.district_id, Some(3));
        assert_eq!(decoded.district_name.as_deref(), Some("Ranchi"));
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config("test-secret-long-enough-for-hmac");
        let mut claims = Claims::new(1, Role::Citizen, 24);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60; // well past the default leeway
        let token = issue(&claims, &cfg).expect("issue");
        assert!(validate(&token, &cfg).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(&Claims::new(1, Role::StateAdmin, 1), &config("alpha")).expect("issue");
        assert!(validate(&token, &config("bravo")).is_err());
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::StateAdmin).unwrap(), "\"state_admin\"");
    }
}
