//! Request and response bodies for the REST API.

use clinic_core::{Hospital, Patient, RenderReport, SectionOutcome, Visit};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Generate and deliver the prescription for a completed visit.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionReq {
    pub patient: Patient,
    pub hospital: Hospital,
    pub visit: Visit,
    /// Overrides `visit.prescription` when present.
    #[serde(default)]
    pub prescription: Option<String>,
}

impl CreatePrescriptionReq {
    /// The prescription text to render and to send as the text fallback.
    pub fn prescription_text(&self) -> &str {
        self.prescription
            .as_deref()
            .unwrap_or(&self.visit.prescription)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionStatus {
    pub section: String,
    pub rendered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SectionStatus {
    pub fn from_report(report: &RenderReport) -> Vec<Self> {
        report
            .sections
            .iter()
            .map(|(section, outcome)| match outcome {
                SectionOutcome::Rendered => Self {
                    section: section.to_string(),
                    rendered: true,
                    reason: None,
                },
                SectionOutcome::Skipped(reason) => Self {
                    section: section.to_string(),
                    rendered: false,
                    reason: Some(reason.to_string()),
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionRes {
    pub artifact_name: String,
    /// Public retrieval URL handed to the messaging transport.
    pub artifact_url: String,
    pub page_count: usize,
    pub prescription_items: Vec<String>,
    pub sections: Vec<SectionStatus>,
}
