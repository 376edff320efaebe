//! Case domain model.
//!
//! # Responsibility
//! - Define the canonical case record and its creation request.
//! - Format, parse and validate `YYMM-NN` case numbers and folder names.
//!
//! # Invariants
//! - Generated case numbers use sequence values `01..=99`.
//! - Folder names never contain path separators and are never `.`/`..`.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Storage/display format for `Case::created_at`.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Highest sequence number available per month.
pub const MAX_CASE_SEQUENCE: u8 = 99;

static CASE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("valid case number regex"));

/// Kind of investigation; selects the folder layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseType {
    Person,
    Company,
    #[serde(rename = "Threat Intel")]
    ThreatIntel,
    Event,
}

impl CaseType {
    pub const ALL: [CaseType; 4] = [
        CaseType::Person,
        CaseType::Company,
        CaseType::ThreatIntel,
        CaseType::Event,
    ];

    /// Text stored in `cases.case_type` and shown to users.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Company => "Company",
            Self::ThreatIntel => "Threat Intel",
            Self::Event => "Event",
        }
    }
}

impl Display for CaseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseType {
    type Err = CaseValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ");
        match normalized.as_str() {
            "person" => Ok(Self::Person),
            "company" => Ok(Self::Company),
            "threat intel" => Ok(Self::ThreatIntel),
            "event" => Ok(Self::Event),
            _ => Err(CaseValidationError::UnknownCaseType(value.to_string())),
        }
    }
}

/// Canonical case record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    pub case_number: String,
    pub case_type: CaseType,
    /// Name of a client in the clients store, if one is attached.
    pub client_name: Option<String>,
    /// Directory name under the base path. Equals `case_number` unless the
    /// case was created with a custom name.
    pub folder_name: String,
    #[serde(with = "created_at_format")]
    pub created_at: NaiveDateTime,
}

impl Case {
    /// Whether the folder is named after the case number.
    pub fn folder_mirrors_number(&self) -> bool {
        self.folder_name == self.case_number
    }
}

/// Input for case creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCaseRequest {
    pub case_type: CaseType,
    pub client_name: Option<String>,
    /// Custom folder name; defaults to the allocated case number.
    pub case_name: Option<String>,
}

impl NewCaseRequest {
    pub fn new(case_type: CaseType) -> Self {
        Self {
            case_type,
            client_name: None,
            case_name: None,
        }
    }
}

/// Validation errors for case values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseValidationError {
    BlankName,
    InvalidFolderName(String),
    /// Custom name shaped like a generated case number.
    ReservedCaseName(String),
    UnknownCaseType(String),
}

impl Display for CaseValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "case name must not be blank"),
            Self::InvalidFolderName(value) => {
                write!(f, "`{value}` cannot be used as a case folder name")
            }
            Self::ReservedCaseName(value) => write!(
                f,
                "`{value}` looks like a case number; pick a different case name"
            ),
            Self::UnknownCaseType(value) => write!(
                f,
                "unknown case type `{value}`; expected Person|Company|Threat Intel|Event"
            ),
        }
    }
}

impl Error for CaseValidationError {}

/// Returns the `YYMM` prefix for the month containing `date`.
pub fn month_prefix(date: NaiveDate) -> String {
    date.format("%y%m").to_string()
}

/// Formats `YYMM-NN`.
pub fn format_case_number(prefix: &str, sequence: u8) -> String {
    format!("{prefix}-{sequence:02}")
}

/// Splits a generated case number into its month prefix and sequence.
///
/// Returns `None` for custom numbers that do not follow `YYMM-NN` or use a
/// sequence outside `01..=99`.
pub fn parse_case_number(value: &str) -> Option<(&str, u8)> {
    let caps = CASE_NUMBER_RE.captures(value)?;
    let prefix = caps.get(1)?.as_str();
    let sequence: u8 = caps.get(2)?.as_str().parse().ok()?;
    if sequence == 0 || sequence > MAX_CASE_SEQUENCE {
        return None;
    }
    Some((prefix, sequence))
}

/// Trims and validates a value that will become a directory name.
pub fn normalize_folder_name(value: &str) -> Result<String, CaseValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CaseValidationError::BlankName);
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\', '\0']) {
        return Err(CaseValidationError::InvalidFolderName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Validates a custom case name. Names of the `YYMM-NN` form are reserved
/// for allocated case numbers so they never occupy a future number's folder.
pub fn normalize_case_name(value: &str) -> Result<String, CaseValidationError> {
    let name = normalize_folder_name(value)?;
    if parse_case_number(&name).is_some() {
        return Err(CaseValidationError::ReservedCaseName(name));
    }
    Ok(name)
}

mod created_at_format {
    use super::CREATED_AT_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(CREATED_AT_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, CREATED_AT_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_type_parses_display_and_cli_spellings() {
        assert_eq!("Threat Intel".parse::<CaseType>().unwrap(), CaseType::ThreatIntel);
        assert_eq!("threat_intel".parse::<CaseType>().unwrap(), CaseType::ThreatIntel);
        assert_eq!("COMPANY".parse::<CaseType>().unwrap(), CaseType::Company);
        assert!("vehicle".parse::<CaseType>().is_err());
    }

    #[test]
    fn case_number_format_and_parse_agree() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let number = format_case_number(&month_prefix(date), 7);
        assert_eq!(number, "2403-07");
        assert_eq!(parse_case_number(&number), Some(("2403", 7)));
        assert_eq!(parse_case_number("2403-00"), None);
        assert_eq!(parse_case_number("acme-investigation"), None);
    }

    #[test]
    fn folder_name_rejects_traversal() {
        assert_eq!(normalize_folder_name("  2403-01 ").unwrap(), "2403-01");
        assert!(normalize_folder_name("..").is_err());
        assert!(normalize_folder_name("a/b").is_err());
        assert_eq!(
            normalize_folder_name("   ").unwrap_err(),
            CaseValidationError::BlankName
        );
    }

    #[test]
    fn case_name_cannot_take_case_number_shape() {
        assert_eq!(normalize_case_name(" Operation Owl ").unwrap(), "Operation Owl");
        assert_eq!(normalize_case_name("2403-00").unwrap(), "2403-00");
        assert_eq!(
            normalize_case_name("2403-02").unwrap_err(),
            CaseValidationError::ReservedCaseName("2403-02".to_string())
        );
    }
}
