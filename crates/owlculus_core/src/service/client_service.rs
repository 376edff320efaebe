//! Client use-case service.
//!
//! # Invariants
//! - Client names are trimmed and non-blank.
//! - Name uniqueness is checked on both add and rename.

use crate::model::client::{
    normalize_client_name, Client, ClientPatch, ClientValidationError, NewClient,
};
use crate::repo::client_repo::ClientRepository;
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ClientServiceError {
    Validation(ClientValidationError),
    ClientExists(String),
    ClientNotFound(String),
    Repo(RepoError),
}

impl Display for ClientServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ClientExists(name) => write!(f, "A client with the name '{name}' already exists."),
            Self::ClientNotFound(key) => write!(f, "client not found: {key}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ClientServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClientValidationError> for ClientServiceError {
    fn from(value: ClientValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ClientServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ClientServiceResult<T> = Result<T, ClientServiceError>;

/// Client service facade over repository implementations.
pub struct ClientService<R: ClientRepository> {
    repo: R,
}

impl<R: ClientRepository> ClientService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn client_exists(&self, name: &str) -> RepoResult<bool> {
        self.repo.client_exists(name.trim())
    }

    pub fn add_client(&self, client: &NewClient) -> ClientServiceResult<Client> {
        let client = client.normalized()?;
        if self.repo.client_exists(&client.name)? {
            warn!("event=client_add module=client status=rejected reason=name_exists");
            return Err(ClientServiceError::ClientExists(client.name));
        }

        let created = self
            .repo
            .create_client(&client)
            .map_err(|err| unique_to_exists(err, &client.name))?;
        info!(
            "event=client_add module=client status=ok client_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn get_client(&self, id: i64) -> RepoResult<Option<Client>> {
        self.repo.get_client(id)
    }

    pub fn get_client_by_name(&self, name: &str) -> RepoResult<Option<Client>> {
        self.repo.get_client_by_name(name.trim())
    }

    /// Loads a client by name or fails with `ClientNotFound`.
    pub fn require_client(&self, name: &str) -> ClientServiceResult<Client> {
        self.get_client_by_name(name)?
            .ok_or_else(|| ClientServiceError::ClientNotFound(name.trim().to_string()))
    }

    pub fn list_clients(&self) -> RepoResult<Vec<Client>> {
        self.repo.list_clients()
    }

    /// Applies a partial update and returns the stored row.
    pub fn update_client(&self, id: i64, patch: &ClientPatch) -> ClientServiceResult<Client> {
        let current = self
            .repo
            .get_client(id)?
            .ok_or_else(|| ClientServiceError::ClientNotFound(id.to_string()))?;

        let mut patch = ClientPatch {
            name: patch
                .name
                .as_deref()
                .map(normalize_client_name)
                .transpose()?,
            point_of_contact: patch.point_of_contact.as_deref().map(|v| v.trim().to_string()),
            phone_number: patch.phone_number.as_deref().map(|v| v.trim().to_string()),
            email: patch.email.as_deref().map(|v| v.trim().to_string()),
        };
        if patch.name.as_deref() == Some(current.name.as_str()) {
            patch.name = None;
        }
        if let Some(name) = patch.name.as_deref() {
            if self.repo.client_exists(name)? {
                warn!(
                    "event=client_update module=client status=rejected reason=name_exists client_id={}",
                    id
                );
                return Err(ClientServiceError::ClientExists(name.to_string()));
            }
        }
        if patch.is_empty() {
            return Ok(current);
        }

        let target = patch.name.clone().unwrap_or_else(|| current.name.clone());
        if self
            .repo
            .update_client(id, &patch)
            .map_err(|err| unique_to_exists(err, &target))?
            == 0
        {
            return Err(ClientServiceError::ClientNotFound(id.to_string()));
        }
        info!(
            "event=client_update module=client status=ok client_id={} renamed={}",
            id,
            patch.name.is_some()
        );

        self.repo
            .get_client(id)?
            .ok_or_else(|| ClientServiceError::ClientNotFound(id.to_string()))
    }

    /// Renames a client found by its current name.
    pub fn rename_client(&self, old_name: &str, new_name: &str) -> ClientServiceResult<Client> {
        let current = self.require_client(old_name)?;
        self.update_client(
            current.id,
            &ClientPatch {
                name: Some(new_name.to_string()),
                ..ClientPatch::default()
            },
        )
    }

    /// Deletes a client and returns the removed row.
    pub fn delete_client(&self, id: i64) -> ClientServiceResult<Client> {
        let current = self
            .repo
            .get_client(id)?
            .ok_or_else(|| ClientServiceError::ClientNotFound(id.to_string()))?;
        self.repo.delete_client(id)?;
        info!("event=client_delete module=client status=ok client_id={}", id);
        Ok(current)
    }
}

fn unique_to_exists(err: RepoError, name: &str) -> ClientServiceError {
    match err {
        RepoError::UniqueViolation(_) => ClientServiceError::ClientExists(name.to_string()),
        other => ClientServiceError::Repo(other),
    }
}
