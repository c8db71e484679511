//! # Clinic Core
//!
//! Core logic for generating and delivering clinic prescriptions.
//!
//! This crate contains the document pipeline and its collaborators:
//! - Decoding of logo and signature images from data URIs
//! - Layout of the prescription document and painting it to PDF
//! - Assembly of the PDF into the artifact store, with validation
//! - Delivery to the patient with a plain-text fallback, and cleanup of expired artifacts
//!
//! **No API concerns**: HTTP servers, authentication and request/response types belong in
//! `api-rest` and `api-shared`.

pub mod config;
pub mod constants;
pub mod delivery;
mod error;
pub mod image;
pub mod prescription;
pub mod reaper;
pub mod records;
pub mod render;

#[cfg(test)]
mod fixtures;

pub use config::ClinicConfig;
pub use delivery::{DeliveryOutcome, DeliveryService, LogNotifier, Notifier, NotifyError};
pub use error::{ClinicError, ClinicResult};
pub use prescription::{GeneratedArtifact, PrescriptionAssembler};
pub use records::{Branding, Hospital, Patient, Visit};
pub use render::{RenderReport, Section, SectionOutcome, SkipReason};

pub use clinic_artifacts::{ArtifactError, ArtifactName, ArtifactStore};
