//! SQLite-backed lot store.
//!
//! The sheet lives in three tables: the header, the rows (cells as a JSON
//! array), and a single-row meta table holding a revision counter. A write
//! bumps the counter with a guarded UPDATE inside the same transaction that
//! replaces the rows, so a stale writer changes nothing.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

use super::{LotStore, Revision, StoreError, Table, VersionedTable};

#[derive(Debug, Clone)]
pub struct SqliteLotStore {
    pool: SqlitePool,
}

impl SqliteLotStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteLotStore { pool }
    }
}

#[async_trait]
impl LotStore for SqliteLotStore {
    async fn read_all(&self) -> Result<VersionedTable, StoreError> {
        let mut tx = self.pool.begin().await?;

        let revision: i64 = sqlx::query("SELECT revision FROM sheet_meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("revision");

        let header = sqlx::query("SELECT name FROM sheet_header ORDER BY position ASC")
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.get::<String, _>("name"))
            .collect::<Vec<_>>();

        let raw_rows = sqlx::query("SELECT position, cells FROM sheet_rows ORDER BY position ASC")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for row in &raw_rows {
            let position: i64 = row.get("position");
            let cells: String = row.get("cells");
            let cells: Vec<String> = serde_json::from_str(&cells).map_err(|e| {
                StoreError::Corrupt(format!("row {} cells: {}", position, e))
            })?;
            rows.push(cells);
        }

        debug!(rows = rows.len(), revision, "Read ledger sheet");
        Ok(VersionedTable {
            table: Table { header, rows },
            revision: Revision::new(revision.to_string()),
        })
    }

    async fn write_all(&self, table: &Table, expected: &Revision) -> Result<Revision, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current: i64 = sqlx::query("SELECT revision FROM sheet_meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("revision");

        let conflict = || StoreError::Conflict {
            expected: expected.clone(),
            actual: Revision::new(current.to_string()),
        };
        let expected_num = expected.as_str().parse::<i64>().map_err(|_| conflict())?;

        let bumped = sqlx::query(
            "UPDATE sheet_meta SET revision = revision + 1 WHERE id = 1 AND revision = ?",
        )
        .bind(expected_num)
        .execute(&mut *tx)
        .await?;
        if bumped.rows_affected() == 0 {
            return Err(conflict());
        }

        sqlx::query("DELETE FROM sheet_header")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sheet_rows")
            .execute(&mut *tx)
            .await?;

        for (position, name) in table.header.iter().enumerate() {
            sqlx::query("INSERT INTO sheet_header (position, name) VALUES (?, ?)")
                .bind(position as i64)
                .bind(name.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for (position, cells) in table.rows.iter().enumerate() {
            let encoded = serde_json::to_string(cells)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            sqlx::query("INSERT INTO sheet_rows (position, cells) VALUES (?, ?)")
                .bind(position as i64)
                .bind(encoded)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let revision = expected_num + 1;
        debug!(rows = table.rows.len(), revision, "Wrote ledger sheet");
        Ok(Revision::new(revision.to_string()))
    }
}
