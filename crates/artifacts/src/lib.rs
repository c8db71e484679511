//! Clinic Artifact Storage
//!
//! This crate provides the short-lived handoff area for generated documents (prescription PDFs).
//!
//! ## Design Principles
//!
//! - Artifacts are written once under a unique name and never modified
//! - Names are validated before they touch the filesystem (no traversal, no hidden files)
//! - The producer creates the artifact, the delivery path reads and deletes it
//! - Anything left behind is reclaimed by an age-based reaper
//!
//! ## Layout
//!
//! ```text
//! <artifact_dir>/
//! ├── prescription_<patientId>_<epochMillis>.pdf
//! └── prescription_<patientId>_<epochMillis>.pdf
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use clinic_artifacts::{ArtifactName, ArtifactStore};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ArtifactStore::new(Path::new("temp"))?;
//! let name = ArtifactName::for_prescription("p1", chrono::Utc::now());
//! store.write(&name, b"%PDF-1.3 ...")?;
//! # Ok(())
//! # }
//! ```

mod name;
mod store;

pub use name::{ArtifactName, ARTIFACT_EXTENSION, PRESCRIPTION_PREFIX};
pub use store::{ArtifactMetadata, ArtifactStore};

/// Magic marker every PDF artifact must start with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Errors that can occur during artifact operations
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Artifact directory could not be created or is not a directory
    #[error("Invalid artifact directory: {0}")]
    InvalidDirectory(String),

    /// Name failed validation (potential directory traversal or unsafe name)
    #[error("Invalid artifact name: {0}")]
    InvalidName(String),

    /// An artifact with the same name already exists
    #[error("Artifact {0} already exists")]
    AlreadyExists(String),

    /// The artifact does not exist (never written, or already cleaned up)
    #[error("Artifact {0} not found")]
    NotFound(String),

    /// The artifact exists but has no content
    #[error("Artifact {0} is empty")]
    Empty(String),

    /// The artifact does not start with the expected magic marker
    #[error("Artifact {name} has unexpected header {found:?}")]
    BadMagic { name: String, found: Vec<u8> },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
