//! Case use-case service.
//!
//! # Responsibility
//! - Allocate case numbers and scaffold case folders.
//! - Keep each case's database row and directory in step on create, rename
//!   and delete.
//!
//! # Invariants
//! - New case numbers are the first unused `YYMM-NN` of the current month.
//! - A rejected rename leaves both the row and the directory untouched.
//! - Deleting a case removes its row and its whole directory tree.
//! - When the filesystem step fails, the row change is reverted.

use crate::layout::{load_templates, scaffold_case_folder, LayoutError, ScaffoldContext, TemplateSource};
use crate::model::case::{
    format_case_number, month_prefix, normalize_case_name, normalize_folder_name,
    parse_case_number, Case,
    CaseValidationError, NewCaseRequest, CREATED_AT_FORMAT, MAX_CASE_SEQUENCE,
};
use crate::repo::case_repo::{CaseInsert, CaseRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Errors from case use-cases.
#[derive(Debug)]
pub enum CaseServiceError {
    Validation(CaseValidationError),
    CaseNotFound(String),
    CaseNumberExists(String),
    FolderExists(PathBuf),
    /// All 99 numbers of the month are taken.
    CaseNumbersExhausted(String),
    Layout(LayoutError),
    Io { path: PathBuf, source: io::Error },
    Repo(RepoError),
}

impl Display for CaseServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CaseNotFound(number) => write!(f, "case not found: {number}"),
            Self::CaseNumberExists(number) => write!(f, "Case number {number} already exists."),
            Self::FolderExists(path) => write!(f, "case folder already exists: {}", path.display()),
            Self::CaseNumbersExhausted(prefix) => {
                write!(f, "no available case numbers for month {prefix}")
            }
            Self::Layout(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CaseServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Layout(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CaseValidationError> for CaseServiceError {
    fn from(value: CaseValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CaseServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<LayoutError> for CaseServiceError {
    fn from(value: LayoutError) -> Self {
        match value {
            LayoutError::FolderExists(path) => Self::FolderExists(path),
            other => Self::Layout(other),
        }
    }
}

pub type CaseServiceResult<T> = Result<T, CaseServiceError>;

/// Case service facade over a repository and the case base directory.
pub struct CaseService<R: CaseRepository> {
    repo: R,
    base_path: PathBuf,
    templates: TemplateSource,
}

impl<R: CaseRepository> CaseService<R> {
    pub fn new(repo: R, base_path: impl Into<PathBuf>, templates: TemplateSource) -> Self {
        Self {
            repo,
            base_path: base_path.into(),
            templates,
        }
    }

    /// Directory holding every case folder.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the first unused `YYMM-NN` for the month of `today`.
    pub fn next_case_number(&self, today: NaiveDate) -> CaseServiceResult<String> {
        let prefix = month_prefix(today);
        let numbers = self.repo.case_numbers_with_prefix(&prefix)?;
        let taken: HashSet<u8> = numbers
            .iter()
            .filter_map(|number| parse_case_number(number))
            .filter(|(number_prefix, _)| *number_prefix == prefix)
            .map(|(_, sequence)| sequence)
            .collect();

        match (1..=MAX_CASE_SEQUENCE).find(|sequence| !taken.contains(sequence)) {
            Some(sequence) => Ok(format_case_number(&prefix, sequence)),
            None => Err(CaseServiceError::CaseNumbersExhausted(prefix)),
        }
    }

    /// Creates a case stamped with the current local time.
    pub fn create_case(&self, request: &NewCaseRequest) -> CaseServiceResult<Case> {
        self.create_case_at(request, Local::now().naive_local())
    }

    /// Creates a case as if it were `now`: allocates the number, stores the
    /// row and scaffolds the folder.
    pub fn create_case_at(
        &self,
        request: &NewCaseRequest,
        now: NaiveDateTime,
    ) -> CaseServiceResult<Case> {
        let started_at = Instant::now();
        let custom_name = request
            .case_name
            .as_deref()
            .map(normalize_case_name)
            .transpose()?;
        let templates = load_templates(&self.templates)?;

        let case_number = match self.next_case_number(now.date()) {
            Ok(number) => number,
            Err(err) => {
                warn!(
                    "event=case_create module=case status=error error_code=numbers_exhausted error={}",
                    err
                );
                return Err(err);
            }
        };
        let folder_name = custom_name.unwrap_or_else(|| case_number.clone());
        let case_root = self.base_path.join(&folder_name);
        if case_root.exists() {
            return Err(CaseServiceError::FolderExists(case_root));
        }

        let insert = CaseInsert {
            case_number: case_number.clone(),
            case_type: request.case_type,
            client_name: request.client_name.clone(),
            folder_name,
            created_at: now.with_nanosecond(0).unwrap_or(now),
        };
        let case = self
            .repo
            .insert_case(&insert)
            .map_err(|err| unique_to_exists(err, &case_number))?;

        let ctx = ScaffoldContext {
            case_number: &case.case_number,
            case_type: case.case_type,
            date: now.date(),
        };
        if let Err(err) = scaffold_case_folder(&case_root, &ctx, &templates) {
            error!(
                "event=case_create module=case status=error case_number={} error_code=scaffold_failed error={}",
                case.case_number, err
            );
            if !matches!(err, LayoutError::FolderExists(_)) && case_root.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&case_root) {
                    warn!(
                        "event=case_create module=case status=error case_number={} error_code=cleanup_failed error={}",
                        case.case_number, cleanup
                    );
                }
            }
            if let Err(revert) = self.repo.delete_case(&case.case_number) {
                warn!(
                    "event=case_create module=case status=error case_number={} error_code=row_revert_failed error={}",
                    case.case_number, revert
                );
            }
            return Err(err.into());
        }

        info!(
            "event=case_create module=case status=ok case_number={} case_type={} duration_ms={}",
            case.case_number,
            case.case_type,
            started_at.elapsed().as_millis()
        );
        Ok(case)
    }

    pub fn get_case(&self, case_number: &str) -> RepoResult<Option<Case>> {
        self.repo.get_case(case_number)
    }

    /// Loads a case or fails with `CaseNotFound`.
    pub fn require_case(&self, case_number: &str) -> CaseServiceResult<Case> {
        self.repo
            .get_case(case_number)?
            .ok_or_else(|| CaseServiceError::CaseNotFound(case_number.to_string()))
    }

    pub fn list_cases(&self) -> RepoResult<Vec<Case>> {
        self.repo.list_cases()
    }

    pub fn list_case_numbers(&self) -> RepoResult<Vec<String>> {
        Ok(self
            .repo
            .list_cases()?
            .into_iter()
            .map(|case| case.case_number)
            .collect())
    }

    /// Case-insensitive substring match over the visible case columns.
    pub fn search_cases(&self, text: &str) -> RepoResult<Vec<Case>> {
        let needle = text.trim().to_lowercase();
        let cases = self.repo.list_cases()?;
        if needle.is_empty() {
            return Ok(cases);
        }
        Ok(cases
            .into_iter()
            .filter(|case| {
                let created = case.created_at.format(CREATED_AT_FORMAT).to_string();
                [
                    case.case_number.as_str(),
                    case.case_type.as_str(),
                    case.client_name.as_deref().unwrap_or_default(),
                    case.folder_name.as_str(),
                    created.as_str(),
                ]
                .iter()
                .any(|value| value.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Absolute folder of an existing case.
    pub fn case_folder(&self, case_number: &str) -> CaseServiceResult<PathBuf> {
        let case = self.require_case(case_number)?;
        Ok(self.base_path.join(case.folder_name))
    }

    /// Renames a case number, moving its folder when the folder is named
    /// after the number.
    pub fn rename_case(&self, old_case_number: &str, new_case_number: &str) -> CaseServiceResult<Case> {
        let new_case_number = normalize_folder_name(new_case_number)?;
        let case = self.require_case(old_case_number)?;
        if case.case_number == new_case_number {
            return Ok(case);
        }
        if self.repo.case_number_exists(&new_case_number)? {
            warn!(
                "event=case_rename module=case status=rejected reason=number_exists case_number={}",
                old_case_number
            );
            return Err(CaseServiceError::CaseNumberExists(new_case_number));
        }

        let moves_folder = case.folder_mirrors_number();
        let old_root = self.base_path.join(&case.folder_name);
        let new_root = self.base_path.join(&new_case_number);
        if moves_folder && new_root.exists() {
            return Err(CaseServiceError::FolderExists(new_root));
        }

        let new_folder = moves_folder.then_some(new_case_number.as_str());
        self.repo
            .rename_case(&case.case_number, &new_case_number, new_folder)
            .map_err(|err| unique_to_exists(err, &new_case_number))?;

        if moves_folder && old_root.exists() {
            if let Err(source) = fs::rename(&old_root, &new_root) {
                error!(
                    "event=case_rename module=case status=error case_number={} error_code=folder_rename_failed error={}",
                    case.case_number, source
                );
                self.repo
                    .rename_case(&new_case_number, &case.case_number, Some(&case.folder_name))?;
                return Err(CaseServiceError::Io {
                    path: old_root,
                    source,
                });
            }
        }

        info!(
            "event=case_rename module=case status=ok from={} to={} moved_folder={}",
            case.case_number, new_case_number, moves_folder
        );
        self.require_case(&new_case_number)
    }

    /// Deletes the case row and its directory tree.
    pub fn delete_case(&self, case_number: &str) -> CaseServiceResult<()> {
        let case = self.require_case(case_number)?;
        self.repo.delete_case(&case.case_number)?;

        let case_root = self.base_path.join(&case.folder_name);
        if case_root.exists() {
            if let Err(source) = fs::remove_dir_all(&case_root) {
                error!(
                    "event=case_delete module=case status=error case_number={} error_code=folder_remove_failed error={}",
                    case.case_number, source
                );
                self.repo.insert_case(&CaseInsert {
                    case_number: case.case_number.clone(),
                    case_type: case.case_type,
                    client_name: case.client_name.clone(),
                    folder_name: case.folder_name.clone(),
                    created_at: case.created_at,
                })?;
                return Err(CaseServiceError::Io {
                    path: case_root,
                    source,
                });
            }
        }

        info!(
            "event=case_delete module=case status=ok case_number={}",
            case.case_number
        );
        Ok(())
    }

    /// Sets or clears the client attached to a case.
    pub fn assign_client(&self, case_number: &str, client_name: Option<&str>) -> CaseServiceResult<Case> {
        if self.repo.set_client(case_number, client_name)? == 0 {
            return Err(CaseServiceError::CaseNotFound(case_number.to_string()));
        }
        self.require_case(case_number)
    }

    pub fn rename_client_refs(&self, old_name: &str, new_name: &str) -> RepoResult<usize> {
        self.repo.rename_client_refs(old_name, new_name)
    }

    pub fn clear_client_refs(&self, client_name: &str) -> RepoResult<usize> {
        self.repo.clear_client_refs(client_name)
    }
}

fn unique_to_exists(err: RepoError, case_number: &str) -> CaseServiceError {
    match err {
        RepoError::UniqueViolation(_) => CaseServiceError::CaseNumberExists(case_number.to_string()),
        other => CaseServiceError::Repo(other),
    }
}
