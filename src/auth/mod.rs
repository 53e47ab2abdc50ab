// src/auth/mod.rs

pub mod extract;
pub mod jwt;
pub mod password;

pub use extract::{AuthUser, CitizenUser, DistrictAdmin, StateAdminUser};
pub use jwt::{Claims, JwtConfig, Role};
