//! Project repository: CRUD operations for the `projects` table.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{now_timestamp, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub job_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProjectRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            job_number: row.get("job_number")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a project and returns the stored row.
pub fn insert(
    db: &Database,
    name: &str,
    description: Option<&str>,
    job_number: Option<&str>,
) -> Result<ProjectRow, DatabaseError> {
    let now = now_timestamp();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO projects (name, description, job_number, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![name, description, job_number, now],
        )?;
        let id = conn.last_insert_rowid();
        Ok(ProjectRow {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            job_number: job_number.map(str::to_string),
            created_at: now.clone(),
            updated_at: now.clone(),
        })
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<ProjectRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                ProjectRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Fields to change on an existing project; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub job_number: Option<&'a str>,
}

/// Applies `changes` and returns the updated row, or `None` when no such
/// project exists.
pub fn update(
    db: &Database,
    id: i64,
    changes: &ProjectChanges<'_>,
) -> Result<Option<ProjectRow>, DatabaseError> {
    let now = now_timestamp();
    let changed = db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE projects SET name = COALESCE(?2, name),
             description = COALESCE(?3, description),
             job_number = COALESCE(?4, job_number),
             updated_at = ?5
             WHERE id = ?1",
            params![id, changes.name, changes.description, changes.job_number, now],
        )?;
        Ok(changed == 1)
    })?;

    if !changed {
        return Ok(None);
    }
    find_by_id(db, id)
}

/// Deletes a project; its contracts go with it. Returns `false` when no such
/// project existed.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    })
}

/// All projects, newest first.
pub fn list(db: &Database) -> Result<Vec<ProjectRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM projects ORDER BY created_at DESC, id DESC")?;
        let rows = stmt
            .query_map([], ProjectRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let db = Database::open_in_memory().unwrap();
        let project =
            insert(&db, "Harbor Expansion", Some("Phase 2 contracts"), Some("J-1042")).unwrap();

        let found = find_by_id(&db, project.id).unwrap().unwrap();
        assert_eq!(found, project);
        assert_eq!(found.job_number.as_deref(), Some("J-1042"));
    }

    #[test]
    fn test_optional_fields() {
        let db = Database::open_in_memory().unwrap();
        let project = insert(&db, "Minimal", None, None).unwrap();
        let found = find_by_id(&db, project.id).unwrap().unwrap();
        assert!(found.description.is_none());
        assert!(found.job_number.is_none());
    }

    #[test]
    fn test_find_missing() {
        let db = Database::open_in_memory().unwrap();
        assert!(find_by_id(&db, 42).unwrap().is_none());
    }

    #[test]
    fn test_list() {
        let db = Database::open_in_memory().unwrap();
        insert(&db, "A", None, None).unwrap();
        insert(&db, "B", None, None).unwrap();
        let names: Vec<String> = list(&db).unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"A".to_string()));
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let project = insert(&db, "Harbor", Some("Phase 1"), Some("J-1")).unwrap();

        let updated = update(
            &db,
            project.id,
            &ProjectChanges {
                job_number: Some("J-2"),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated.name, "Harbor");
        assert_eq!(updated.description.as_deref(), Some("Phase 1"));
        assert_eq!(updated.job_number.as_deref(), Some("J-2"));
        assert_eq!(updated.created_at, project.created_at);
    }

    #[test]
    fn test_update_missing() {
        let db = Database::open_in_memory().unwrap();
        let changes = ProjectChanges {
            name: Some("Renamed"),
            ..Default::default()
        };
        assert!(update(&db, 42, &changes).unwrap().is_none());
    }

    #[test]
    fn test_delete_cascades_to_contracts() {
        use crate::db::contract_repo::{self, NewContract};

        let db = Database::open_in_memory().unwrap();
        let project = insert(&db, "Harbor", None, None).unwrap();
        let contract_id = contract_repo::insert(
            &db,
            &NewContract {
                project_id: project.id,
                file_name: "lease.pdf",
                file_location: "project_1/lease.pdf",
                file_size: None,
            },
        )
        .unwrap();

        assert!(delete(&db, project.id).unwrap());
        assert!(!delete(&db, project.id).unwrap());
        assert!(find_by_id(&db, project.id).unwrap().is_none());
        assert!(contract_repo::find_by_id(&db, contract_id).unwrap().is_none());
    }
}
