//! SQLite persistence session.

use crate::{
    ChangeSet, CommitSummary, Document, EntityState, Error, ModificationAction,
    PersistenceSession, Record, Result,
};
use chrono::{DateTime, Utc};
use policy::ResourceType;
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// SQLite-backed persistence session.
///
/// Every entity is stored as a JSON row keyed by resource type and key.
#[derive(Clone)]
pub struct SqliteSession {
    conn: Arc<Mutex<Connection>>,
}

/// A document as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub document: Document,
    pub updated_at: DateTime<Utc>,
}

struct PendingRow {
    action: ModificationAction,
    state: EntityState,
    resource_type: String,
    key: String,
    data: String,
}

impl SqliteSession {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                resource_type TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (resource_type, key)
            );
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Load a single document.
    pub fn load(&self, resource_type: &ResourceType, key: &str) -> Result<Option<StoredDocument>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let row = conn
            .query_row(
                "SELECT data, updated_at FROM records WHERE resource_type = ?1 AND key = ?2",
                params![resource_type.as_str(), key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(data, updated_at)| stored(resource_type, key.to_string(), &data, &updated_at))
            .transpose()
    }

    /// Load a typed record by id.
    pub fn get<T: Record + DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let data = conn
            .query_row(
                "SELECT data FROM records WHERE resource_type = ?1 AND key = ?2",
                params![T::RESOURCE_TYPE, id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        data.map(|d| serde_json::from_str(&d).map_err(Error::from))
            .transpose()
    }

    /// List all documents of a resource type, ordered by key.
    pub fn list(&self, resource_type: &ResourceType) -> Result<Vec<StoredDocument>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(
            "SELECT key, data, updated_at FROM records
             WHERE resource_type = ?1 ORDER BY key",
        )?;

        let rows = stmt
            .query_map([resource_type.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(key, data, updated_at)| stored(resource_type, key, &data, &updated_at))
            .collect()
    }
}

impl PersistenceSession for SqliteSession {
    async fn commit(
        &self,
        changes: &ChangeSet,
        cancel: &CancellationToken,
    ) -> Result<CommitSummary> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let rows = changes
            .iter()
            .map(|m| -> Result<PendingRow> {
                Ok(PendingRow {
                    action: m.action,
                    state: m.state,
                    resource_type: m.entity.resource_type().to_string(),
                    key: m.entity.key(),
                    data: serde_json::to_string(&m.entity.to_value()?)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Once the write starts it runs to completion or rolls back as a unit.
        let conn = Arc::clone(&self.conn);
        let summary = tokio::task::spawn_blocking(move || write_rows(&conn, &rows))
            .await
            .map_err(|e| Error::Task(e.to_string()))??;

        tracing::debug!(
            "Committed change-set: {} inserted, {} updated, {} deleted",
            summary.inserted,
            summary.updated,
            summary.deleted
        );
        Ok(summary)
    }
}

fn write_rows(conn: &Mutex<Connection>, rows: &[PendingRow]) -> Result<CommitSummary> {
    let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
    let tx = conn.transaction()?;
    let now = Utc::now().to_rfc3339();
    let mut summary = CommitSummary::default();

    for row in rows {
        match row.state {
            EntityState::Added => {
                tx.execute(
                    "INSERT INTO records (resource_type, key, data, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![row.resource_type, row.key, row.data, now],
                )?;
                summary.inserted += 1;
            }
            EntityState::Modified => {
                // A remove rewritten to an update may carry only its key and flag;
                // merge it into the stored row instead of replacing it.
                let sql = if row.action == ModificationAction::Remove {
                    "UPDATE records SET data = json_patch(data, ?3), updated_at = ?4
                     WHERE resource_type = ?1 AND key = ?2"
                } else {
                    "UPDATE records SET data = ?3, updated_at = ?4
                     WHERE resource_type = ?1 AND key = ?2"
                };
                let changed = tx.execute(sql, params![row.resource_type, row.key, row.data, now])?;
                if changed == 0 {
                    return Err(Error::NotFound(format!("{}/{}", row.resource_type, row.key)));
                }
                summary.updated += 1;
            }
            EntityState::Deleted => {
                let changed = tx.execute(
                    "DELETE FROM records WHERE resource_type = ?1 AND key = ?2",
                    params![row.resource_type, row.key],
                )?;
                if changed == 0 {
                    return Err(Error::NotFound(format!("{}/{}", row.resource_type, row.key)));
                }
                summary.deleted += 1;
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}

fn stored(
    resource_type: &ResourceType,
    key: String,
    data: &str,
    updated_at: &str,
) -> Result<StoredDocument> {
    let updated_at = DateTime::parse_from_rfc3339(updated_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidRow(format!("{resource_type}/{key}: {e}")))?;

    Ok(StoredDocument {
        document: Document {
            resource_type: resource_type.clone(),
            key,
            fields: serde_json::from_str(data)?,
        },
        updated_at,
    })
}
