// src/lib.rs

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod geo;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
