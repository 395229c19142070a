//! Contract repository: CRUD and status writes for the `contracts` table.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use serde_json::Value;

use super::{now_timestamp, Database, DatabaseError};
use crate::status::ProcessingStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractRow {
    pub id: i64,
    pub project_id: i64,
    pub file_name: String,
    /// Storage key of the uploaded document.
    pub file_location: String,
    pub file_size: Option<i64>,
    pub contract_data: Value,
    pub processing_status: ProcessingStatus,
    pub processed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ContractRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status_text: String = row.get("processing_status")?;
        let processing_status = status_text
            .parse::<ProcessingStatus>()
            .map_err(|e| conversion_error(row, "processing_status", e))?;

        let data_text: String = row.get("contract_data")?;
        let contract_data = serde_json::from_str(&data_text)
            .map_err(|e| conversion_error(row, "contract_data", e))?;

        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            file_name: row.get("file_name")?,
            file_location: row.get("file_location")?,
            file_size: row.get("file_size")?,
            contract_data,
            processing_status,
            processed_at: row.get("processed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn conversion_error<E>(row: &Row<'_>, column: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Fields supplied when a contract is first recorded.
#[derive(Debug, Clone)]
pub struct NewContract<'a> {
    pub project_id: i64,
    pub file_name: &'a str,
    pub file_location: &'a str,
    pub file_size: Option<i64>,
}

/// Inserts a contract in `pending` with empty data; returns the new id.
pub fn insert(db: &Database, contract: &NewContract<'_>) -> Result<i64, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO contracts (project_id, file_name, file_location, file_size,
             contract_data, processing_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, '{}', ?5, ?6, ?6)",
            params![
                contract.project_id,
                contract.file_name,
                contract.file_location,
                contract.file_size,
                ProcessingStatus::Pending.as_str(),
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<ContractRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM contracts WHERE id = ?1",
                params![id],
                ContractRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Contracts of one project in upload order.
pub fn list_by_project(db: &Database, project_id: i64) -> Result<Vec<ContractRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM contracts WHERE project_id = ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![project_id], ContractRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// What a status write does to `processed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedAt<'a> {
    Keep,
    Stamp(&'a str),
    Clear,
}

/// Status write that only applies while the contract is still in `expected`.
///
/// `contract_data` is left untouched when `None`.
/// Returns `false` when the row was missing or its status had moved on.
pub fn transition(
    db: &Database,
    id: i64,
    expected: ProcessingStatus,
    to: ProcessingStatus,
    contract_data: Option<&Value>,
    processed_at: ProcessedAt<'_>,
) -> Result<bool, DatabaseError> {
    let data_text = contract_data.map(serde_json::to_string).transpose()?;
    let (stamp, clear) = match processed_at {
        ProcessedAt::Keep => (None, false),
        ProcessedAt::Stamp(at) => (Some(at), false),
        ProcessedAt::Clear => (None, true),
    };
    let now = now_timestamp();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE contracts SET processing_status = ?3,
             contract_data = COALESCE(?4, contract_data),
             processed_at = CASE WHEN ?7 THEN NULL ELSE COALESCE(?5, processed_at) END,
             updated_at = ?6
             WHERE id = ?1 AND processing_status = ?2",
            params![
                id,
                expected.as_str(),
                to.as_str(),
                data_text,
                stamp,
                now,
                clear
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Unconditional status write for administrative overrides.
pub fn overwrite_status(
    db: &Database,
    id: i64,
    status: ProcessingStatus,
    contract_data: Option<&Value>,
    processed_at: Option<&str>,
) -> Result<bool, DatabaseError> {
    let data_text = contract_data.map(serde_json::to_string).transpose()?;
    let now = now_timestamp();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE contracts SET processing_status = ?2,
             contract_data = COALESCE(?3, contract_data),
             processed_at = COALESCE(?4, processed_at),
             updated_at = ?5
             WHERE id = ?1",
            params![id, status.as_str(), data_text, processed_at, now],
        )?;
        Ok(changed == 1)
    })
}

/// Contracts in `status`, oldest first.
pub fn list_by_status(
    db: &Database,
    status: ProcessingStatus,
) -> Result<Vec<ContractRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM contracts WHERE processing_status = ?1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map(params![status.as_str()], ContractRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Returns `false` when no such contract existed.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM contracts WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    })
}
