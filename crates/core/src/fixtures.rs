//! Shared records for unit tests.

use crate::records::{Hospital, Patient, Visit};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

pub(crate) fn generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap()
}

/// The Jane Doe / City Clinic visit: two prescription lines, no notes, no branding images.
pub(crate) fn jane_doe() -> (Patient, Hospital, Visit) {
    let patient = serde_json::from_value(json!({
        "id": "p1",
        "name": "Jane Doe",
        "age": 34,
        "gender": "female",
        "contactNumber": "9999999999"
    }))
    .unwrap();

    let hospital = serde_json::from_value(json!({
        "name": "City Clinic",
        "address": "1 Main St",
        "phoneNumber": "555-0100",
        "branding": { "primaryColor": "#1a56db" }
    }))
    .unwrap();

    let visit = serde_json::from_value(json!({
        "symptoms": "fever, cough",
        "diagnosis": "viral infection",
        "prescription": "Paracetamol 500mg twice daily\nRest and fluids",
        "doctorNotes": "NA"
    }))
    .unwrap();

    (patient, hospital, visit)
}
