//! HTTP handlers for orthox-api.

pub mod cases;
pub mod health;
pub mod notes;
pub mod pipeline;
