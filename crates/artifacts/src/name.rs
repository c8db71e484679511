//! Validated artifact file names.

use crate::ArtifactError;
use chrono::{DateTime, Utc};

/// Prefix for generated prescription documents.
pub const PRESCRIPTION_PREFIX: &str = "prescription";

/// Extension for generated prescription documents.
pub const ARTIFACT_EXTENSION: &str = "pdf";

const MAX_NAME_LEN: usize = 255;

/// A file name that is safe to join onto the artifact directory.
///
/// Only ASCII letters, digits, `_`, `-` and `.` are allowed. Names may not start with a dot
/// and may not contain `..`, so they can never escape the directory or address hidden files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Validates an externally supplied name (for example from a retrieval URL).
    pub fn parse(input: &str) -> Result<Self, ArtifactError> {
        if input.is_empty() || input.len() > MAX_NAME_LEN {
            return Err(ArtifactError::InvalidName(format!(
                "name length must be 1..={MAX_NAME_LEN}"
            )));
        }
        if input.starts_with('.') || input.contains("..") {
            return Err(ArtifactError::InvalidName(input.to_string()));
        }
        if !input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(ArtifactError::InvalidName(input.to_string()));
        }
        Ok(Self(input.to_string()))
    }

    /// Builds `prescription_<patientId>_<epochMillis>.pdf`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` in the patient id are replaced with `_`; an id with
    /// no usable characters becomes `unknown`.
    pub fn for_prescription(patient_id: &str, at: DateTime<Utc>) -> Self {
        let mut id: String = patient_id
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .take(128)
            .collect();
        if id.is_empty() {
            id.push_str("unknown");
        }

        Self(format!(
            "{PRESCRIPTION_PREFIX}_{id}_{}.{ARTIFACT_EXTENSION}",
            at.timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ArtifactName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ArtifactName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ArtifactName::parse(&s).map_err(serde::de::Error::custom)
    }
}
