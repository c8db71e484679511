//! Prescription delivery to the patient.
//!
//! Delivery goes through a [`Notifier`] transport. The document is offered first, by URL; if that
//! fails, or no document could be generated, a plain-text message carrying the raw prescription
//! is sent instead. The text fallback is attempted whatever the transport.
//!
//! A delivered artifact is deleted once the retention window has passed, giving the provider time
//! to fetch it. An artifact that could not be delivered is deleted straight away.

use crate::config::ClinicConfig;
use crate::constants::ARTIFACT_ROUTE_PREFIX;
use crate::records::Patient;
use crate::{ClinicError, ClinicResult};
use async_trait::async_trait;
use clinic_artifacts::{ArtifactName, ArtifactStore};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("recipient address is invalid: {0}")]
    InvalidRecipient(String),
    #[error("message rejected by transport: {0}")]
    Rejected(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Outbound messaging transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `body` with the document at `media_url` attached.
    async fn send_document(&self, to: &str, body: &str, media_url: &str)
        -> Result<(), NotifyError>;

    async fn send_text(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Transport that only logs what would have been sent.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_document(
        &self,
        to: &str,
        body: &str,
        media_url: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!("document to {}: {} ({})", to, body, media_url);
        Ok(())
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!("text to {}: {}", to, body);
        Ok(())
    }
}

/// Messaging address for a patient contact number.
///
/// Numbers already written with a leading `+` keep their own country code.
pub fn recipient_address(country_code: &str, contact_number: &str) -> ClinicResult<String> {
    let trimmed = contact_number.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(ClinicError::InvalidInput(format!(
            "contact number {contact_number:?} has no digits"
        )));
    }

    if trimmed.starts_with('+') {
        Ok(format!("whatsapp:+{digits}"))
    } else {
        Ok(format!("whatsapp:+{country_code}{digits}"))
    }
}

pub fn ready_message(patient_name: &str) -> String {
    format!("Hello {}, your prescription is ready.", patient_name.trim())
}

pub fn fallback_message(patient_name: &str, prescription: &str) -> String {
    format!(
        "Hello {}, your prescription is ready. Details: {}",
        patient_name.trim(),
        prescription
    )
}

/// Public URL the messaging provider fetches an artifact from.
pub fn artifact_url(public_base_url: &str, name: &ArtifactName) -> String {
    format!(
        "{}/{}/{}",
        public_base_url.trim_end_matches('/'),
        ARTIFACT_ROUTE_PREFIX,
        name
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The document was sent; the artifact is deleted after the retention window.
    Document,
    /// Only the plain-text prescription was sent.
    TextFallback,
    /// Nothing reached the patient.
    Undelivered,
}

#[derive(Clone)]
pub struct DeliveryService {
    notifier: Arc<dyn Notifier>,
    store: ArtifactStore,
    public_base_url: String,
    country_code: String,
    retention: Duration,
}

impl DeliveryService {
    pub fn new(notifier: Arc<dyn Notifier>, store: ArtifactStore, cfg: &ClinicConfig) -> Self {
        Self {
            notifier,
            store,
            public_base_url: cfg.public_base_url().to_string(),
            country_code: cfg.country_code().to_string(),
            retention: cfg.retention(),
        }
    }

    pub fn artifact_url(&self, name: &ArtifactName) -> String {
        artifact_url(&self.public_base_url, name)
    }

    /// Deliver a prescription to the patient.
    ///
    /// `artifact` is `None` when generation failed, in which case only the text is sent.
    pub async fn deliver(
        &self,
        patient: &Patient,
        prescription: &str,
        artifact: Option<&ArtifactName>,
    ) -> DeliveryOutcome {
        let to = match recipient_address(&self.country_code, &patient.contact_number) {
            Ok(to) => to,
            Err(e) => {
                tracing::warn!("cannot deliver prescription for patient {}: {}", patient.id, e);
                if let Some(name) = artifact {
                    self.delete_now(name);
                }
                return DeliveryOutcome::Undelivered;
            }
        };

        if let Some(name) = artifact {
            let url = self.artifact_url(name);
            match self
                .notifier
                .send_document(&to, &ready_message(&patient.name), &url)
                .await
            {
                Ok(()) => {
                    self.delete_after_retention(name.clone());
                    return DeliveryOutcome::Document;
                }
                Err(e) => {
                    tracing::warn!("document delivery to {} failed: {}", to, e);
                    self.delete_now(name);
                }
            }
        }

        match self
            .notifier
            .send_text(&to, &fallback_message(&patient.name, prescription))
            .await
        {
            Ok(()) => DeliveryOutcome::TextFallback,
            Err(e) => {
                tracing::error!("text fallback to {} failed: {}", to, e);
                DeliveryOutcome::Undelivered
            }
        }
    }

    fn delete_now(&self, name: &ArtifactName) {
        if let Err(e) = self.store.delete(name) {
            tracing::warn!("failed to delete artifact {}: {}", name, e);
        }
    }

    fn delete_after_retention(&self, name: ArtifactName) {
        let store = self.store.clone();
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            match store.delete(&name) {
                Ok(true) => tracing::info!("deleted delivered artifact {}", name),
                Ok(false) => {}
                Err(e) => tracing::warn!("failed to delete artifact {}: {}", name, e),
            }
        });
    }
}
