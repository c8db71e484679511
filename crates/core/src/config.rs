//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handlers never read environment variables themselves, which
//! keeps behaviour consistent across threads and test harnesses.

use crate::constants::{
    DEFAULT_ARTIFACT_DIR, DEFAULT_COUNTRY_CODE, DEFAULT_PLATFORM_NAME,
    DEFAULT_PUBLIC_BASE_URL, DEFAULT_REAPER_INTERVAL_SECS, DEFAULT_RETENTION_SECS,
};
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClinicConfig {
    artifact_dir: PathBuf,
    public_base_url: String,
    retention: Duration,
    reaper_interval: Duration,
    platform_name: String,
    country_code: String,
}

impl ClinicConfig {
    /// Create a new `ClinicConfig`.
    ///
    /// The base URL is stored without a trailing slash. The country code must be digits only.
    pub fn new(
        artifact_dir: PathBuf,
        public_base_url: String,
        retention: Duration,
        reaper_interval: Duration,
        platform_name: String,
        country_code: String,
    ) -> ClinicResult<Self> {
        let public_base_url = public_base_url.trim().trim_end_matches('/').to_string();
        if !(public_base_url.starts_with("http://") || public_base_url.starts_with("https://")) {
            return Err(ClinicError::InvalidConfig(
                "public base URL must start with http:// or https://".into(),
            ));
        }

        if platform_name.trim().is_empty() {
            return Err(ClinicError::InvalidConfig(
                "platform name cannot be empty".into(),
            ));
        }

        if country_code.is_empty() || !country_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClinicError::InvalidConfig(
                "country code must contain digits only".into(),
            ));
        }

        if reaper_interval.is_zero() {
            return Err(ClinicError::InvalidConfig(
                "reaper interval must be greater than zero".into(),
            ));
        }

        Ok(Self {
            artifact_dir,
            public_base_url,
            retention,
            reaper_interval,
            platform_name: platform_name.trim().to_string(),
            country_code,
        })
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn reaper_interval(&self) -> Duration {
        self.reaper_interval
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Resolves configuration from optional raw values, as read from the environment.
    ///
    /// Missing or blank values fall back to the defaults in [`crate::constants`].
    pub fn from_env_values(
        artifact_dir: Option<String>,
        public_base_url: Option<String>,
        retention_secs: Option<String>,
        reaper_interval_secs: Option<String>,
        platform_name: Option<String>,
        country_code: Option<String>,
    ) -> ClinicResult<Self> {
        let artifact_dir = non_blank(artifact_dir).unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.into());
        let public_base_url =
            non_blank(public_base_url).unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into());
        let retention = secs_from_env_value(retention_secs, DEFAULT_RETENTION_SECS)?;
        let reaper_interval =
            secs_from_env_value(reaper_interval_secs, DEFAULT_REAPER_INTERVAL_SECS)?;
        let platform_name =
            non_blank(platform_name).unwrap_or_else(|| DEFAULT_PLATFORM_NAME.into());
        let country_code = non_blank(country_code)
            .map(|c| c.trim_start_matches('+').to_string())
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.into());

        Self::new(
            PathBuf::from(artifact_dir),
            public_base_url,
            retention,
            reaper_interval,
            platform_name,
            country_code,
        )
    }
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.into(),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
            platform_name: DEFAULT_PLATFORM_NAME.into(),
            country_code: DEFAULT_COUNTRY_CODE.into(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a whole number of seconds from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default_secs`.
pub fn secs_from_env_value(value: Option<String>, default_secs: u64) -> ClinicResult<Duration> {
    let parsed = non_blank(value)
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                ClinicError::InvalidConfig(format!("expected a whole number of seconds, got {v:?}"))
            })
        })
        .transpose()?;

    Ok(Duration::from_secs(parsed.unwrap_or(default_secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let cfg = ClinicConfig::from_env_values(None, None, None, None, None, None).unwrap();

        assert_eq!(cfg.artifact_dir(), Path::new("temp"));
        assert_eq!(cfg.public_base_url(), "http://localhost:5000");
        assert_eq!(cfg.retention(), Duration::from_secs(300));
        assert_eq!(cfg.reaper_interval(), Duration::from_secs(60));
        assert_eq!(cfg.platform_name(), DEFAULT_PLATFORM_NAME);
        assert_eq!(cfg.country_code(), "91");
    }

    #[test]
    fn test_overrides_are_trimmed() {
        let cfg = ClinicConfig::from_env_values(
            Some("/var/tmp/rx".into()),
            Some("https://rx.example.org/ ".into()),
            Some(" 120 ".into()),
            Some("5".into()),
            Some("  Sunrise Health  ".into()),
            Some("+44".into()),
        )
        .unwrap();

        assert_eq!(cfg.artifact_dir(), Path::new("/var/tmp/rx"));
        assert_eq!(cfg.public_base_url(), "https://rx.example.org");
        assert_eq!(cfg.retention(), Duration::from_secs(120));
        assert_eq!(cfg.reaper_interval(), Duration::from_secs(5));
        assert_eq!(cfg.platform_name(), "Sunrise Health");
        assert_eq!(cfg.country_code(), "44");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ClinicConfig::from_env_values(None, Some("ftp://x".into()), None, None, None, None)
            .is_err());
        assert!(
            ClinicConfig::from_env_values(None, None, Some("five".into()), None, None, None)
                .is_err()
        );
        assert!(
            ClinicConfig::from_env_values(None, None, None, Some("0".into()), None, None).is_err()
        );
        assert!(
            ClinicConfig::from_env_values(None, None, None, None, None, Some("9a".into())).is_err()
        );
    }

    #[test]
    fn test_blank_seconds_use_default() {
        assert_eq!(
            secs_from_env_value(Some("   ".into()), 7).unwrap(),
            Duration::from_secs(7)
        );
    }
}
