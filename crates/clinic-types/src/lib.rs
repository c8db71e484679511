//! Validated text types shared across the clinic crates.
//!
//! Free-text fields arriving from the record store are opaque strings. Two conventions mean
//! "nothing here": an empty (or whitespace-only) string, and for visit sections the sentinel
//! [`NOT_AVAILABLE`]. Both are normalised to `None` at the deserialisation boundary so that
//! downstream code only ever sees `Option<NonEmptyText>`.

/// Sentinel used by clinicians to mark a visit section as intentionally left out.
pub const NOT_AVAILABLE: &str = "NA";

#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("text is blank")]
    Empty,
}

/// Trimmed text with at least one visible character.
///
/// Every optional free-text field a document prints (email, doctor name, visit sections) is
/// carried as `Option<NonEmptyText>`, so layout code never has to re-check for blanks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input`; blank input is rejected.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        match input.as_ref().trim() {
            "" => Err(TextError::Empty),
            text => Ok(Self(text.to_string())),
        }
    }

    /// Converts an optional raw field into `Some` only when it carries content.
    pub fn from_field(input: Option<&str>) -> Option<Self> {
        input.and_then(|s| Self::new(s).ok())
    }

    /// Like [`NonEmptyText::from_field`], but also treats the [`NOT_AVAILABLE`] sentinel as absent.
    pub fn from_section(input: Option<&str>) -> Option<Self> {
        Self::from_field(input).filter(|text| text.as_str() != NOT_AVAILABLE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for lenient optional text fields.
///
/// Use with `#[serde(default, deserialize_with = "...")]`. `null`, missing, empty and
/// whitespace-only values all become `None`.
pub mod optional {
    use super::NonEmptyText;
    use serde::{Deserialize, Deserializer};

    /// Blank values become `None`.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<NonEmptyText>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(NonEmptyText::from_field(raw.as_deref()))
    }

    /// `null` becomes an empty string; text is kept as sent.
    pub fn or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Blank values and the `"NA"` sentinel become `None`.
    pub fn section<'de, D>(deserializer: D) -> Result<Option<NonEmptyText>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(NonEmptyText::from_section(raw.as_deref()))
    }
}
