//! Client contact records.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted client row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub point_of_contact: String,
    pub phone_number: String,
    pub email: String,
}

/// Input for client creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub point_of_contact: String,
    pub phone_number: String,
    pub email: String,
}

impl NewClient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trims every field and rejects a blank name.
    pub fn normalized(&self) -> Result<Self, ClientValidationError> {
        Ok(Self {
            name: normalize_client_name(&self.name)?,
            point_of_contact: self.point_of_contact.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub point_of_contact: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.point_of_contact.is_none()
            && self.phone_number.is_none()
            && self.email.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientValidationError {
    BlankName,
}

impl Display for ClientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "client name must not be blank"),
        }
    }
}

impl Error for ClientValidationError {}

pub fn normalize_client_name(value: &str) -> Result<String, ClientValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientValidationError::BlankName);
    }
    Ok(trimmed.to_string())
}
