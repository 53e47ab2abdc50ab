// src/services/mod.rs

pub mod analytics;
pub mod escalation;
pub mod intake;
pub mod status;
