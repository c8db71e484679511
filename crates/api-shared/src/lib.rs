//! # API Shared
//!
//! Shared utilities and definitions for the clinic APIs.
//!
//! Contains:
//! - Request and response bodies (`dto` module)
//! - Shared services like `HealthService`
//! - Authentication utilities
//!
//! Used by `api-rest` and the combined `clinic-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::{CreatePrescriptionReq, CreatePrescriptionRes, HealthRes, SectionStatus};
pub use health::HealthService;
