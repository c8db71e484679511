//! Constants used throughout the clinic core crate.

/// Default directory for generated artifacts when no explicit directory is configured.
pub const DEFAULT_ARTIFACT_DIR: &str = "temp";

/// Default public base URL the messaging provider fetches artifacts from.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:5000";

/// URL path segment under which artifacts are served.
pub const ARTIFACT_ROUTE_PREFIX: &str = "temp";

/// Default retention window for delivered artifacts, in seconds.
pub const DEFAULT_RETENTION_SECS: u64 = 300;

/// Default interval between reaper sweeps, in seconds.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60;

/// Default platform attribution printed in the document footer.
pub const DEFAULT_PLATFORM_NAME: &str = "Clinic Health Platform";

/// Default dialling code prepended to patient contact numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Brand colour used when a hospital has none configured.
pub const DEFAULT_PRIMARY_COLOR: &str = "#1a56db";

/// Heading printed in the title band.
pub const PRESCRIPTION_TITLE: &str = "MEDICAL PRESCRIPTION";

/// Decoded images shorter than this are treated as garbage rather than images.
pub const MIN_IMAGE_BYTES: usize = 50;
