use clinic_artifacts::ArtifactError;

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load PDF font: {0}")]
    PdfFont(printpdf::Error),
    #[error("failed to serialise PDF: {0}")]
    PdfSave(printpdf::Error),

    #[error("failed to write artifact: {0}")]
    ArtifactWrite(#[source] ArtifactError),
    #[error("generated artifact failed validation: {0}")]
    ArtifactValidation(#[source] ArtifactError),
    #[error("artifact store error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("generation task failed: {0}")]
    GenerationTask(String),

    #[error("failed to read input file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
