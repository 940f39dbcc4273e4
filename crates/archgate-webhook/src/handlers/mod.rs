//! HTTP request handlers.

pub mod admission;
pub mod health;
pub mod metrics;
