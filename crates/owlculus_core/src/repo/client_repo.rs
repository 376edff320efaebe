//! Client repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Client names are unique (exact, case-sensitive match).
//! - List order is `name ASC, id ASC`.

use crate::model::client::{Client, ClientPatch, NewClient};
use crate::repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const CLIENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    point_of_contact,
    phone_number,
    email
FROM clients";

/// Repository interface for client persistence.
pub trait ClientRepository {
    fn client_exists(&self, name: &str) -> RepoResult<bool>;
    fn create_client(&self, client: &NewClient) -> RepoResult<Client>;
    fn get_client(&self, id: i64) -> RepoResult<Option<Client>>;
    fn get_client_by_name(&self, name: &str) -> RepoResult<Option<Client>>;
    fn list_clients(&self) -> RepoResult<Vec<Client>>;
    /// Applies the non-`None` fields of `patch`. Returns rows changed.
    fn update_client(&self, id: i64, patch: &ClientPatch) -> RepoResult<usize>;
    fn delete_client(&self, id: i64) -> RepoResult<usize>;
}

/// SQLite-backed client repository.
pub struct SqliteClientRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClientRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ClientRepository for SqliteClientRepository<'_> {
    fn client_exists(&self, name: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM clients WHERE name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_client(&self, client: &NewClient) -> RepoResult<Client> {
        self.conn.execute(
            "INSERT INTO clients (
                name,
                point_of_contact,
                phone_number,
                email
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                client.name.as_str(),
                client.point_of_contact.as_str(),
                client.phone_number.as_str(),
                client.email.as_str(),
            ],
        )?;

        Ok(Client {
            id: self.conn.last_insert_rowid(),
            name: client.name.clone(),
            point_of_contact: client.point_of_contact.clone(),
            phone_number: client.phone_number.clone(),
            email: client.email.clone(),
        })
    }

    fn get_client(&self, id: i64) -> RepoResult<Option<Client>> {
        let client = self
            .conn
            .query_row(
                &format!("{CLIENT_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_client_row,
            )
            .optional()?;
        Ok(client)
    }

    fn get_client_by_name(&self, name: &str) -> RepoResult<Option<Client>> {
        let client = self
            .conn
            .query_row(
                &format!("{CLIENT_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_client_row,
            )
            .optional()?;
        Ok(client)
    }

    fn list_clients(&self) -> RepoResult<Vec<Client>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CLIENT_SELECT_SQL} ORDER BY name ASC, id ASC;"))?;
        let clients = stmt
            .query_map([], parse_client_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clients)
    }

    fn update_client(&self, id: i64, patch: &ClientPatch) -> RepoResult<usize> {
        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        let columns = [
            ("name", &patch.name),
            ("point_of_contact", &patch.point_of_contact),
            ("phone_number", &patch.phone_number),
            ("email", &patch.email),
        ];
        for (column, value) in columns {
            if let Some(value) = value {
                assignments.push(format!("{column} = ?"));
                bind_values.push(Value::Text(value.clone()));
            }
        }

        if assignments.is_empty() {
            return Ok(0);
        }

        let sql = format!("UPDATE clients SET {} WHERE id = ?;", assignments.join(", "));
        bind_values.push(Value::Integer(id));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }

    fn delete_client(&self, id: i64) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM clients WHERE id = ?1;", [id])?;
        Ok(changed)
    }
}

fn parse_client_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get("id")?,
        name: row.get("name")?,
        point_of_contact: row.get("point_of_contact")?,
        phone_number: row.get("phone_number")?,
        email: row.get("email")?,
    })
}
