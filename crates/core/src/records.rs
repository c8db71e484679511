//! Read-only record shapes consumed by the prescription pipeline.
//!
//! Records are owned and mutated by the record store; this crate only reads them. Optional fields
//! that arrive blank are normalised to `None` here, and visit sections additionally treat the
//! `"NA"` sentinel as absent.

use crate::{ClinicError, ClinicResult};
use clinic_types::{optional, NonEmptyText};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Stable record identifier; also accepted as `_id`.
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    /// Years; fractional for infants. Printed without a trailing `.0`.
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: f64,
    #[serde(default, deserialize_with = "optional::or_empty")]
    pub gender: String,
    #[serde(default, deserialize_with = "optional::or_empty")]
    pub contact_number: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAge {
    Number(f64),
    Text(String),
}

/// Accepts a number, a numeric string or `null` (treated as 0).
fn lenient_age<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let age = match Option::<RawAge>::deserialize(deserializer)? {
        None => 0.0,
        Some(RawAge::Number(n)) => n,
        Some(RawAge::Text(text)) if text.trim().is_empty() => 0.0,
        Some(RawAge::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid age: {text:?}")))?,
    };

    if !age.is_finite() || age < 0.0 {
        return Err(serde::de::Error::custom(format!("invalid age: {age}")));
    }
    Ok(age)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    /// Data URI or bare base64 image.
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub logo: Option<NonEmptyText>,
    /// CSS-style hex colour such as `#1a56db`.
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub primary_color: Option<NonEmptyText>,
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub letterhead_text: Option<NonEmptyText>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub name: String,
    #[serde(default, deserialize_with = "optional::or_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "optional::or_empty")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub email: Option<NonEmptyText>,
    #[serde(default)]
    pub branding: Branding,
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub doctor_name: Option<NonEmptyText>,
    /// Data URI or bare base64 image.
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub doctor_signature: Option<NonEmptyText>,
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub doctor_designation: Option<NonEmptyText>,
    #[serde(default, deserialize_with = "optional::text")]
    #[schema(value_type = Option<String>)]
    pub doctor_registration_number: Option<NonEmptyText>,
}

impl Hospital {
    /// Name printed in the signature card and used as the document author.
    pub fn signatory(&self) -> &str {
        self.doctor_name
            .as_ref()
            .map(NonEmptyText::as_str)
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[serde(default, deserialize_with = "optional::section")]
    #[schema(value_type = Option<String>)]
    pub symptoms: Option<NonEmptyText>,
    #[serde(default, deserialize_with = "optional::section")]
    #[schema(value_type = Option<String>)]
    pub diagnosis: Option<NonEmptyText>,
    /// Newline separated; every non-empty line is one prescription entry.
    #[serde(default, deserialize_with = "optional::or_empty")]
    pub prescription: String,
    #[serde(default, deserialize_with = "optional::section")]
    #[schema(value_type = Option<String>)]
    pub doctor_notes: Option<NonEmptyText>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Read a JSON record (patient, hospital or visit) from disk.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> ClinicResult<T> {
    let contents = std::fs::read_to_string(path).map_err(ClinicError::FileRead)?;
    serde_json::from_str(&contents).map_err(ClinicError::Deserialization)
}
