//! Gateway-level handlers; domain handlers live next to their services

pub mod health;

pub use health::{HealthResponse, health_check};
