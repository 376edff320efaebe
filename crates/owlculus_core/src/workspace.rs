//! Application facade over both databases, the case directory and tools.
//!
//! # Responsibility
//! - Own one connection per database file.
//! - Keep the client name stored on cases in step with the clients table.
//! - Route evidence and tool operations to the right case folder.

use crate::config::{AppConfig, ConfigError};
use crate::db::{open_db, open_db_in_memory, DbError, Schema};
use crate::evidence::{self, EvidenceEntry, EvidenceError};
use crate::layout::TemplateSource;
use crate::model::case::{Case, NewCaseRequest};
use crate::model::client::{Client, ClientPatch, NewClient};
use crate::repo::case_repo::SqliteCaseRepository;
use crate::repo::client_repo::SqliteClientRepository;
use crate::repo::RepoError;
use crate::service::case_service::{CaseService, CaseServiceError};
use crate::service::client_service::{ClientService, ClientServiceError};
use crate::tools::{resolve_invocation, spawn_tool, ToolError, ToolRunHandle};
use log::{error, info};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[derive(Debug)]
pub enum WorkspaceError {
    Config(ConfigError),
    Db(DbError),
    Repo(RepoError),
    Case(CaseServiceError),
    Client(ClientServiceError),
    Evidence(EvidenceError),
    Tool(ToolError),
    Io { path: PathBuf, source: io::Error },
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Case(err) => write!(f, "{err}"),
            Self::Client(err) => write!(f, "{err}"),
            Self::Evidence(err) => write!(f, "{err}"),
            Self::Tool(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Case(err) => Some(err),
            Self::Client(err) => Some(err),
            Self::Evidence(err) => Some(err),
            Self::Tool(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(impl From<$source> for WorkspaceError {
            fn from(value: $source) -> Self {
                Self::$variant(value)
            }
        })*
    };
}

impl_from! {
    ConfigError => Config,
    DbError => Db,
    RepoError => Repo,
    CaseServiceError => Case,
    ClientServiceError => Client,
    EvidenceError => Evidence,
    ToolError => Tool,
}

/// Open case workspace.
pub struct Workspace {
    config: AppConfig,
    cases_conn: Connection,
    clients_conn: Connection,
    base_path: PathBuf,
    templates: TemplateSource,
}

impl Workspace {
    /// Opens both database files named by a fully configured `config`.
    pub fn open(config: &AppConfig) -> WorkspaceResult<Self> {
        config.check()?;
        let cases_conn = open_db(config.cases_db_file(), Schema::Cases)?;
        let clients_conn = open_db(config.clients_db_file(), Schema::Clients)?;
        info!("event=workspace_open module=workspace status=ok");
        Ok(Self::from_parts(config, cases_conn, clients_conn))
    }

    /// Workspace with in-memory databases; cases still live under
    /// `config.paths.base_path`.
    pub fn open_in_memory(config: &AppConfig) -> WorkspaceResult<Self> {
        let cases_conn = open_db_in_memory(Schema::Cases)?;
        let clients_conn = open_db_in_memory(Schema::Clients)?;
        Ok(Self::from_parts(config, cases_conn, clients_conn))
    }

    fn from_parts(config: &AppConfig, cases_conn: Connection, clients_conn: Connection) -> Self {
        Self {
            base_path: config.base_path(),
            templates: config.template_source(),
            config: config.clone(),
            cases_conn,
            clients_conn,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn cases(&self) -> CaseService<SqliteCaseRepository<'_>> {
        CaseService::new(
            SqliteCaseRepository::new(&self.cases_conn),
            self.base_path.clone(),
            self.templates.clone(),
        )
    }

    pub fn clients(&self) -> ClientService<SqliteClientRepository<'_>> {
        ClientService::new(SqliteClientRepository::new(&self.clients_conn))
    }

    /// Creates a case after checking that its client, if any, exists.
    pub fn create_case(&self, request: &NewCaseRequest) -> WorkspaceResult<Case> {
        let mut request = request.clone();
        request.client_name = self.existing_client_name(request.client_name.as_deref())?;
        Ok(self.cases().create_case(&request)?)
    }

    /// Attaches an existing client to a case, or detaches with `None`.
    pub fn assign_client(&self, case_number: &str, client_name: Option<&str>) -> WorkspaceResult<Case> {
        let client_name = self.existing_client_name(client_name)?;
        Ok(self
            .cases()
            .assign_client(case_number, client_name.as_deref())?)
    }

    pub fn add_client(&self, client: &NewClient) -> WorkspaceResult<Client> {
        Ok(self.clients().add_client(client)?)
    }

    /// Updates a client found by name; a rename is propagated to its cases.
    pub fn update_client(&self, name: &str, patch: &ClientPatch) -> WorkspaceResult<Client> {
        let clients = self.clients();
        let current = clients.require_client(name)?;
        let updated = clients.update_client(current.id, patch)?;
        if updated.name == current.name {
            return Ok(updated);
        }

        match self
            .cases()
            .rename_client_refs(&current.name, &updated.name)
        {
            Ok(changed) => {
                info!(
                    "event=client_rename module=workspace status=ok client_id={} cases_updated={}",
                    updated.id, changed
                );
                Ok(updated)
            }
            Err(err) => {
                error!(
                    "event=client_rename module=workspace status=error client_id={} error_code=case_refs_failed error={}",
                    updated.id, err
                );
                clients.rename_client(&updated.name, &current.name)?;
                Err(err.into())
            }
        }
    }

    pub fn rename_client(&self, old_name: &str, new_name: &str) -> WorkspaceResult<Client> {
        self.update_client(
            old_name,
            &ClientPatch {
                name: Some(new_name.to_string()),
                ..ClientPatch::default()
            },
        )
    }

    /// Deletes a client and detaches it from its cases. Returns the removed
    /// client and the number of cases detached.
    pub fn delete_client(&self, name: &str) -> WorkspaceResult<(Client, usize)> {
        let clients = self.clients();
        let current = clients.require_client(name)?;
        let removed = clients.delete_client(current.id)?;

        match self.cases().clear_client_refs(&removed.name) {
            Ok(cleared) => {
                info!(
                    "event=client_delete module=workspace status=ok client_id={} cases_detached={}",
                    removed.id, cleared
                );
                Ok((removed, cleared))
            }
            Err(err) => {
                error!(
                    "event=client_delete module=workspace status=error client_id={} error_code=case_refs_failed error={}",
                    removed.id, err
                );
                clients.add_client(&NewClient {
                    name: removed.name.clone(),
                    point_of_contact: removed.point_of_contact.clone(),
                    phone_number: removed.phone_number.clone(),
                    email: removed.email.clone(),
                })?;
                Err(err.into())
            }
        }
    }

    /// Cases attached to `client_name`.
    pub fn cases_for_client(&self, client_name: &str) -> WorkspaceResult<Vec<Case>> {
        let name = client_name.trim();
        Ok(self
            .cases()
            .list_cases()?
            .into_iter()
            .filter(|case| case.client_name.as_deref() == Some(name))
            .collect())
    }

    pub fn case_folder(&self, case_number: &str) -> WorkspaceResult<PathBuf> {
        Ok(self.cases().case_folder(case_number)?)
    }

    pub fn list_evidence(&self, case_number: &str) -> WorkspaceResult<Vec<EvidenceEntry>> {
        let root = self.case_folder(case_number)?;
        Ok(evidence::list_evidence(&root)?)
    }

    pub fn add_evidence(
        &self,
        case_number: &str,
        source: &Path,
        subfolder: Option<&str>,
    ) -> WorkspaceResult<EvidenceEntry> {
        let root = self.case_folder(case_number)?;
        Ok(evidence::add_evidence(&root, source, subfolder)?)
    }

    pub fn remove_evidence(&self, case_number: &str, relative_path: &str) -> WorkspaceResult<()> {
        let root = self.case_folder(case_number)?;
        Ok(evidence::remove_evidence(&root, relative_path)?)
    }

    /// Starts `tool` with the case folder as its output folder.
    pub fn run_tool(
        &self,
        tool: &str,
        case_number: &str,
        args: &BTreeMap<String, String>,
    ) -> WorkspaceResult<ToolRunHandle> {
        let output_folder = self.case_folder(case_number)?;
        let invocation = resolve_invocation(&self.config, tool, &output_folder, args)?;
        fs::create_dir_all(&output_folder).map_err(|source| WorkspaceError::Io {
            path: output_folder.clone(),
            source,
        })?;
        Ok(spawn_tool(invocation))
    }

    /// Trimmed client name, verified to exist; blank means no client.
    fn existing_client_name(&self, client_name: Option<&str>) -> WorkspaceResult<Option<String>> {
        match client_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => Ok(Some(self.clients().require_client(name)?.name)),
            None => Ok(None),
        }
    }
}
