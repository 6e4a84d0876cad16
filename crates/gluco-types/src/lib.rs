//! Small validated value types shared by the gluco crates.

use std::fmt;
use std::str::FromStr;

/// Text shown wherever a value is missing.
pub const PLACEHOLDER: &str = "-";

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, so a patient
/// name of `"  Ada  "` is stored as `"Ada"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NonEmptyText {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyText> for String {
    fn from(value: NonEmptyText) -> Self {
        value.0
    }
}

/// Renders an optional value for display, falling back to [`PLACEHOLDER`].
pub trait OrPlaceholder {
    fn or_placeholder(&self) -> String;
}

impl<T: fmt::Display> OrPlaceholder for Option<T> {
    fn or_placeholder(&self) -> String {
        match self {
            Some(value) => value.to_string(),
            None => PLACEHOLDER.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_rejects_blank_text() {
        assert_eq!(NonEmptyText::new("  Ada Lovelace ").unwrap().as_str(), "Ada Lovelace");
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
        assert_eq!("".parse::<NonEmptyText>(), Err(TextError::Empty));
    }

    #[test]
    fn deserialising_blank_text_fails() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"").expect_err("blank must fail");
        assert!(err.to_string().contains("Text cannot be empty"));

        let ok: NonEmptyText = serde_json::from_str("\"Lispro\"").unwrap();
        assert_eq!(ok.to_string(), "Lispro");
    }

    #[test]
    fn missing_values_render_as_placeholder() {
        assert_eq!(None::<u32>.or_placeholder(), "-");
        assert_eq!(Some(72.5).or_placeholder(), "72.5");
    }
}
