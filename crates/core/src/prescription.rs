//! Prescription assembly.
//!
//! [`PrescriptionAssembler::assemble`] is the entry point used when a visit is completed. It lays
//! out the document, serialises it, writes it to the artifact store under a name derived from the
//! patient id and the current time, and checks that what landed on disk is a PDF. Layout
//! degradations are reported in the returned [`RenderReport`]; only write and validation failures
//! are errors.

use crate::config::ClinicConfig;
use crate::records::{Hospital, Patient, Visit};
use crate::render::{pdf, render_prescription, RenderReport, RenderRequest};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use clinic_artifacts::{ArtifactMetadata, ArtifactName, ArtifactStore, PDF_MAGIC};
use std::path::PathBuf;

/// A prescription PDF that has been written and validated.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    pub name: ArtifactName,
    pub path: PathBuf,
    pub metadata: ArtifactMetadata,
    pub report: RenderReport,
}

#[derive(Debug, Clone)]
pub struct PrescriptionAssembler {
    store: ArtifactStore,
    platform_name: String,
}

impl PrescriptionAssembler {
    pub fn new(store: ArtifactStore, platform_name: impl Into<String>) -> Self {
        Self {
            store,
            platform_name: platform_name.into(),
        }
    }

    /// Opens (creating if needed) the configured artifact directory.
    pub fn from_config(cfg: &ClinicConfig) -> ClinicResult<Self> {
        let store = ArtifactStore::new(cfg.artifact_dir())?;
        Ok(Self::new(store, cfg.platform_name()))
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Generate the prescription PDF for a completed visit.
    ///
    /// Layout and file I/O run on the blocking pool. Concurrent calls for different patients never
    /// collide; two calls for the same patient within the same millisecond fail with
    /// [`ClinicError::ArtifactWrite`] rather than overwrite each other.
    pub async fn assemble(
        &self,
        prescription: &str,
        patient: &Patient,
        hospital: &Hospital,
        visit: &Visit,
    ) -> ClinicResult<GeneratedArtifact> {
        let assembler = self.clone();
        let prescription = prescription.to_owned();
        let patient = patient.clone();
        let hospital = hospital.clone();
        let visit = visit.clone();

        tokio::task::spawn_blocking(move || {
            assembler.assemble_at(&prescription, &patient, &hospital, &visit, Utc::now())
        })
        .await
        .map_err(|e| ClinicError::GenerationTask(e.to_string()))?
    }

    /// Synchronous assembly with an explicit timestamp.
    pub fn assemble_at(
        &self,
        prescription: &str,
        patient: &Patient,
        hospital: &Hospital,
        visit: &Visit,
        generated_at: DateTime<Utc>,
    ) -> ClinicResult<GeneratedArtifact> {
        let request = RenderRequest {
            prescription,
            patient,
            hospital,
            visit,
            platform_name: &self.platform_name,
            generated_at,
        };
        let (document, report) = render_prescription(&request);
        let bytes = pdf::write_pdf(&document)?;

        let name = ArtifactName::for_prescription(&patient.id, generated_at);
        let metadata = self
            .store
            .write(&name, &bytes)
            .map_err(ClinicError::ArtifactWrite)?;

        if let Err(e) = self.store.validate(&name, PDF_MAGIC) {
            if let Err(cleanup) = self.store.delete(&name) {
                tracing::warn!("failed to remove invalid artifact {}: {}", name, cleanup);
            }
            return Err(ClinicError::ArtifactValidation(e));
        }

        tracing::info!(
            "generated {} ({} bytes, {} page(s))",
            name,
            metadata.size_bytes,
            report.page_count
        );

        Ok(GeneratedArtifact {
            path: self.store.path_for(&name),
            name,
            metadata,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::render::Section;
    use clinic_types::NonEmptyText;
    use tempfile::TempDir;

    fn assembler(dir: &TempDir) -> PrescriptionAssembler {
        let store = ArtifactStore::new(dir.path()).unwrap();
        PrescriptionAssembler::new(store, "Clinic Health Platform")
    }

    #[tokio::test]
    async fn test_assemble_writes_valid_pdf() {
        let dir = TempDir::new().unwrap();
        let assembler = assembler(&dir);
        let (patient, hospital, visit) = fixtures::jane_doe();

        let artifact = assembler
            .assemble(&visit.prescription, &patient, &hospital, &visit)
            .await
            .unwrap();

        assert!(artifact.name.as_str().starts_with("prescription_p1_"));
        assert!(artifact.name.as_str().ends_with(".pdf"));
        assert!(artifact.path.starts_with(assembler.store().root_directory()));

        let bytes = std::fs::read(&artifact.path).unwrap();
        assert_eq!(&bytes[..4], PDF_MAGIC);
        assert_eq!(artifact.metadata.size_bytes, bytes.len() as u64);
        assert_eq!(artifact.report.prescription_items.len(), 2);
        assert!(!artifact.report.is_rendered(Section::DoctorNotes));
    }

    #[tokio::test]
    async fn test_concurrent_patients_get_distinct_artifacts() {
        let dir = TempDir::new().unwrap();
        let assembler = assembler(&dir);
        let (patient, hospital, visit) = fixtures::jane_doe();
        let mut other = patient.clone();
        other.id = "p2".into();

        let (a, b) = tokio::join!(
            assembler.assemble(&visit.prescription, &patient, &hospital, &visit),
            assembler.assemble(&visit.prescription, &other, &hospital, &visit),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.name, b.name);
        assert_eq!(assembler.store().list().unwrap().len(), 2);
    }

    #[test]
    fn test_same_patient_same_millisecond_is_a_write_error() {
        let dir = TempDir::new().unwrap();
        let assembler = assembler(&dir);
        let (patient, hospital, visit) = fixtures::jane_doe();
        let at = fixtures::generated_at();

        let first = assembler.assemble_at("Rest", &patient, &hospital, &visit, at);
        assert!(first.is_ok());

        let second = assembler.assemble_at("Rest", &patient, &hospital, &visit, at);
        assert!(matches!(second, Err(ClinicError::ArtifactWrite(_))));
        assert_eq!(assembler.store().list().unwrap().len(), 1);
    }

    #[test]
    fn test_prescription_argument_drives_line_items() {
        let dir = TempDir::new().unwrap();
        let assembler = assembler(&dir);
        let (patient, hospital, visit) = fixtures::jane_doe();

        let artifact = assembler
            .assemble_at("a\nb\nc", &patient, &hospital, &visit, fixtures::generated_at())
            .unwrap();
        assert_eq!(artifact.report.prescription_items, vec!["1. a", "2. b", "3. c"]);
    }

    #[test]
    fn test_broken_branding_images_still_produce_pdf() {
        let dir = TempDir::new().unwrap();
        let assembler = assembler(&dir);
        let (patient, mut hospital, visit) = fixtures::jane_doe();
        let mut webp = b"RIFF\x00\x00\x00\x00WEBPVP8 ".to_vec();
        webp.resize(64, 0);
        hospital.branding.logo = NonEmptyText::new("data:image/png;base64,aGVsbG8=").ok();
        hospital.doctor_signature = NonEmptyText::new(format!(
            "data:image/webp;base64,{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &webp)
        ))
        .ok();

        let artifact = assembler
            .assemble_at(&visit.prescription, &patient, &hospital, &visit, fixtures::generated_at())
            .unwrap();

        let bytes = std::fs::read(&artifact.path).unwrap();
        assert_eq!(&bytes[..4], PDF_MAGIC);
        assert!(!artifact.report.is_rendered(Section::Logo));
        assert!(!artifact.report.is_rendered(Section::SignatureImage));
        assert!(artifact.report.is_rendered(Section::Signature));
    }

    #[test]
    fn test_from_config_creates_directory() {
        let dir = TempDir::new().unwrap();
        let artifact_dir = dir.path().join("nested").join("temp");
        let cfg = ClinicConfig::from_env_values(
            Some(artifact_dir.to_string_lossy().into_owned()),
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();

        let assembler = PrescriptionAssembler::from_config(&cfg).unwrap();
        assert!(artifact_dir.is_dir());
        assert!(assembler.store().list().unwrap().is_empty());
    }
}
