//! Case repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `cases` table.
//! - Maintain the by-name client reference stored on each case.
//!
//! # Invariants
//! - `case_number` uniqueness is enforced by the schema.
//! - List order is deterministic: `created_at ASC, case_number ASC`.

use crate::model::case::{Case, CaseType, CREATED_AT_FORMAT};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

const CASE_SELECT_SQL: &str = "SELECT
    id,
    case_number,
    case_type,
    client_name,
    folder_name,
    created_at
FROM cases";

/// Row values for a case that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseInsert {
    pub case_number: String,
    pub case_type: CaseType,
    pub client_name: Option<String>,
    pub folder_name: String,
    pub created_at: NaiveDateTime,
}

/// Repository interface for case persistence.
pub trait CaseRepository {
    fn case_number_exists(&self, case_number: &str) -> RepoResult<bool>;
    /// Case numbers starting with `prefix-`, used for sequence allocation.
    fn case_numbers_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>>;
    fn insert_case(&self, case: &CaseInsert) -> RepoResult<Case>;
    fn get_case(&self, case_number: &str) -> RepoResult<Option<Case>>;
    fn list_cases(&self) -> RepoResult<Vec<Case>>;
    /// Renames the case number and, when given, the folder name. Returns rows changed.
    fn rename_case(
        &self,
        old_case_number: &str,
        new_case_number: &str,
        new_folder_name: Option<&str>,
    ) -> RepoResult<usize>;
    fn delete_case(&self, case_number: &str) -> RepoResult<usize>;
    fn set_client(&self, case_number: &str, client_name: Option<&str>) -> RepoResult<usize>;
    /// Points every case referencing `old_name` at `new_name`.
    fn rename_client_refs(&self, old_name: &str, new_name: &str) -> RepoResult<usize>;
    /// Detaches `client_name` from every case referencing it.
    fn clear_client_refs(&self, client_name: &str) -> RepoResult<usize>;
}

/// SQLite-backed case repository.
pub struct SqliteCaseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCaseRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CaseRepository for SqliteCaseRepository<'_> {
    fn case_number_exists(&self, case_number: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM cases WHERE case_number = ?1);",
            [case_number],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn case_numbers_with_prefix(&self, prefix: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT case_number
             FROM cases
             WHERE substr(case_number, 1, length(?1) + 1) = ?1 || '-'
             ORDER BY case_number ASC;",
        )?;
        let mut rows = stmt.query([prefix])?;
        let mut numbers = Vec::new();
        while let Some(row) = rows.next()? {
            numbers.push(row.get(0)?);
        }
        Ok(numbers)
    }

    fn insert_case(&self, case: &CaseInsert) -> RepoResult<Case> {
        self.conn.execute(
            "INSERT INTO cases (
                case_number,
                case_type,
                client_name,
                folder_name,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                case.case_number.as_str(),
                case.case_type.as_str(),
                case.client_name.as_deref(),
                case.folder_name.as_str(),
                case.created_at.format(CREATED_AT_FORMAT).to_string(),
            ],
        )?;

        Ok(Case {
            id: self.conn.last_insert_rowid(),
            case_number: case.case_number.clone(),
            case_type: case.case_type,
            client_name: case.client_name.clone(),
            folder_name: case.folder_name.clone(),
            created_at: case.created_at,
        })
    }

    fn get_case(&self, case_number: &str) -> RepoResult<Option<Case>> {
        let case = self
            .conn
            .query_row(
                &format!("{CASE_SELECT_SQL} WHERE case_number = ?1;"),
                [case_number],
                |row| Ok(parse_case_row(row)),
            )
            .optional()?;
        case.transpose()
    }

    fn list_cases(&self) -> RepoResult<Vec<Case>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CASE_SELECT_SQL} ORDER BY created_at ASC, case_number ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut cases = Vec::new();
        while let Some(row) = rows.next()? {
            cases.push(parse_case_row(row)?);
        }
        Ok(cases)
    }

    fn rename_case(
        &self,
        old_case_number: &str,
        new_case_number: &str,
        new_folder_name: Option<&str>,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE cases
             SET case_number = ?2,
                 folder_name = COALESCE(?3, folder_name)
             WHERE case_number = ?1;",
            params![old_case_number, new_case_number, new_folder_name],
        )?;
        Ok(changed)
    }

    fn delete_case(&self, case_number: &str) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM cases WHERE case_number = ?1;", [case_number])?;
        Ok(changed)
    }

    fn set_client(&self, case_number: &str, client_name: Option<&str>) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE cases SET client_name = ?2 WHERE case_number = ?1;",
            params![case_number, client_name],
        )?;
        Ok(changed)
    }

    fn rename_client_refs(&self, old_name: &str, new_name: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE cases SET client_name = ?2 WHERE client_name = ?1;",
            params![old_name, new_name],
        )?;
        Ok(changed)
    }

    fn clear_client_refs(&self, client_name: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE cases SET client_name = NULL WHERE client_name = ?1;",
            [client_name],
        )?;
        Ok(changed)
    }
}

fn parse_case_row(row: &Row<'_>) -> RepoResult<Case> {
    let type_text: String = row.get("case_type")?;
    let case_type = type_text.parse::<CaseType>().map_err(|_| {
        RepoError::InvalidData(format!("invalid case type `{type_text}` in cases.case_type"))
    })?;

    let created_text: String = row.get("created_at")?;
    let created_at =
        NaiveDateTime::parse_from_str(&created_text, CREATED_AT_FORMAT).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{created_text}` in cases.created_at"
            ))
        })?;

    let case_number: String = row.get("case_number")?;
    let folder_name: String = row.get("folder_name")?;
    let folder_name = if folder_name.is_empty() {
        case_number.clone()
    } else {
        folder_name
    };

    Ok(Case {
        id: row.get("id")?,
        case_number,
        case_type,
        client_name: row.get("client_name")?,
        folder_name,
        created_at,
    })
}
