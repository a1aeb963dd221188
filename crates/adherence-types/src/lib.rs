//! Validated value types shared across the adherence tracker workspace.
//!
//! Each type wraps a `String` and can only be constructed through a
//! validating constructor, so downstream code never has to re-check
//! invariants.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input was not a plausible email address
    #[error("Invalid email address")]
    InvalidEmail,
    /// The input was not a systolic/diastolic reading such as "120/80"
    #[error("Invalid blood pressure reading")]
    InvalidBloodPressure,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during
/// construction; a trimmed-empty input is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
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
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An email address that has passed a minimal structural check.
///
/// This is deliberately loose: one `@` with non-empty local part and a
/// domain containing a dot. Mail deliverability is not this type's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses an email address, trimming surrounding whitespace.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(TextError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(TextError::InvalidEmail);
        }
        if domain.starts_with('.') || domain.ends_with('.') {
            return Err(TextError::InvalidEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for EmailAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A blood pressure reading in the conventional "systolic/diastolic" form,
/// e.g. "120/80".
///
/// Both components must be whole numbers of mmHg between 20 and 350.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloodPressure {
    systolic: u16,
    diastolic: u16,
}

impl BloodPressure {
    const MIN_MMHG: u16 = 20;
    const MAX_MMHG: u16 = 350;

    /// Parses a reading such as "120/80".
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        let Some((sys, dia)) = trimmed.split_once('/') else {
            return Err(TextError::InvalidBloodPressure);
        };
        let systolic: u16 = sys
            .trim()
            .parse()
            .map_err(|_| TextError::InvalidBloodPressure)?;
        let diastolic: u16 = dia
            .trim()
            .parse()
            .map_err(|_| TextError::InvalidBloodPressure)?;
        for value in [systolic, diastolic] {
            if !(Self::MIN_MMHG..=Self::MAX_MMHG).contains(&value) {
                return Err(TextError::InvalidBloodPressure);
            }
        }
        Ok(Self {
            systolic,
            diastolic,
        })
    }

    pub fn systolic(&self) -> u16 {
        self.systolic
    }

    pub fn diastolic(&self) -> u16 {
        self.diastolic
    }
}

impl std::fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

impl serde::Serialize for BloodPressure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for BloodPressure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BloodPressure::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        let text = NonEmptyText::new("  take with food  ").unwrap();
        assert_eq!(text.as_str(), "take with food");

        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
    }

    #[test]
    fn email_address_accepts_plausible_addresses() {
        let email = EmailAddress::parse(" alice@example.com ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn email_address_rejects_malformed_input() {
        for input in ["", "alice", "alice@", "@example.com", "alice@nodot"] {
            assert!(EmailAddress::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn blood_pressure_parses_conventional_form() {
        let reading = BloodPressure::parse("120/80").unwrap();
        assert_eq!(reading.systolic(), 120);
        assert_eq!(reading.diastolic(), 80);
        assert_eq!(reading.to_string(), "120/80");
    }

    #[test]
    fn blood_pressure_rejects_malformed_readings() {
        for input in ["", "120", "120-80", "abc/80", "120/8000", "5/80"] {
            assert!(BloodPressure::parse(input).is_err(), "accepted {input:?}");
        }
    }
}
