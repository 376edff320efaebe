//! Core domain logic for Owlculus.
//! Cases, clients, case folders, evidence and OSINT tool runs live here;
//! front ends only call into this crate.

pub mod config;
pub mod db;
pub mod evidence;
pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tools;
pub mod workspace;

pub use config::{
    default_config_path, load_config, load_or_init, save_config, AppConfig, ConfigError,
    ToolConfig,
};
pub use evidence::{EvidenceEntry, EvidenceError, EvidenceKind};
pub use layout::TemplateSource;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::case::{Case, CaseType, NewCaseRequest};
pub use model::client::{Client, ClientPatch, NewClient};
pub use repo::{RepoError, RepoResult};
pub use service::case_service::{CaseService, CaseServiceError};
pub use service::client_service::{ClientService, ClientServiceError};
pub use tools::{ToolError, ToolEvent, ToolRunHandle};
pub use workspace::{Workspace, WorkspaceError, WorkspaceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
