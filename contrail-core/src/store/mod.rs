//! Persistent signal container
//!
//! A [`SignalStore`] maps signal ids to tabular measurement data inside
//! one SQLite file. Tables round-trip exactly through `put` then `get`;
//! `list_ids` and `iterate` reflect every committed put.
//!
//! Concurrency discipline: multiple concurrent readers are safe; a
//! writer must have exclusive access to the container while writing.
//! The discipline is enforced by the caller through the open modes, not
//! by internal locking (WAL mode and the busy timeout back this up).

mod codec;
mod init;

use crate::table::{SignalId, SignalTable};
use crate::{Error, Result};
use codec::{decode_column, encode_column};
use futures::Stream;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DECLARED_SCHEMA_KEY: &str = "declared_schema";

/// How the container resource is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing container, reads only.
    ReadOnly,
    /// Existing container, reads and writes.
    ReadWrite,
    /// New container; fails if one exists unless `overwrite` is set.
    Create { overwrite: bool },
}

/// Per-signal container metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalMeta {
    pub signal_id: SignalId,
    pub row_count: i64,
    pub variables: Vec<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Handle on one container file. Dropping the handle (or calling
/// [`SignalStore::close`]) releases the underlying resource on all exit
/// paths. There is no ambient "current store": every operation goes
/// through an explicit handle, so independent pipelines can run
/// concurrently against different containers.
pub struct SignalStore {
    pool: SqlitePool,
    location: PathBuf,
}

impl SignalStore {
    /// Scoped acquisition of the container at `location`.
    ///
    /// Fails with [`Error::StoreUnavailable`] when the location cannot
    /// be opened, or in create mode when the file already exists and
    /// overwrite was not requested.
    pub async fn open(location: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        let pool = init::open_pool(&location, mode).await?;
        Ok(Self { pool, location })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Deterministic release of the container resource.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Declare a global variable schema for this store. Once declared,
    /// `put` rejects tables whose variable set differs.
    pub async fn declare_schema(&self, variables: &[String]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO store_meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(DECLARED_SCHEMA_KEY)
        .bind(serde_json::to_string(variables)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The declared schema, if any.
    pub async fn declared_schema(&self) -> Result<Option<Vec<String>>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
                .bind(DECLARED_SCHEMA_KEY)
                .fetch_optional(&self.pool)
                .await?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Write or replace the table under `id`. Durable and atomic: an
    /// interrupted put leaves the prior value intact.
    ///
    /// Fails with [`Error::SchemaRejected`] when the store carries a
    /// declared schema and the table's variable set differs from it.
    pub async fn put(&self, id: &str, table: &SignalTable) -> Result<()> {
        let variables = table.variables();
        if let Some(mut declared) = self.declared_schema().await? {
            // table.variables() is already sorted; compare as sets.
            declared.sort();
            if variables != declared {
                return Err(Error::SchemaRejected {
                    id: id.to_string(),
                    expected: declared,
                    actual: variables,
                });
            }
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO signals (signal_id, row_count, variables, positions)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(signal_id) DO UPDATE SET
                row_count = excluded.row_count,
                variables = excluded.variables,
                positions = excluded.positions,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(id)
        .bind(table.len() as i64)
        .bind(serde_json::to_string(&variables)?)
        .bind(encode_column(table.positions()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM signal_columns WHERE signal_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (variable, values) in table.columns() {
            sqlx::query("INSERT INTO signal_columns (signal_id, variable, data) VALUES (?, ?, ?)")
                .bind(id)
                .bind(variable)
                .bind(encode_column(values))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(id, rows = table.len(), variables = variables.len(), "stored signal");
        Ok(())
    }

    /// The table stored under `id`, structurally equal to what was put.
    pub async fn get(&self, id: &str) -> Result<SignalTable> {
        let row = sqlx::query("SELECT positions FROM signals WHERE signal_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::SignalNotFound(id.to_string()))?;
        let positions = decode_column(row.get::<&[u8], _>("positions"))?;

        let column_rows =
            sqlx::query("SELECT variable, data FROM signal_columns WHERE signal_id = ?")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        let mut columns = BTreeMap::new();
        for row in column_rows {
            let variable: String = row.get("variable");
            let values = decode_column(row.get::<&[u8], _>("data"))?;
            columns.insert(variable, values);
        }
        SignalTable::new(positions, columns)
    }

    /// Ids currently stored, in no guaranteed order.
    pub async fn list_ids(&self) -> Result<Vec<SignalId>> {
        let ids = sqlx::query_scalar("SELECT signal_id FROM signals")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Number of signals currently stored.
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signals")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Container metadata for every stored signal.
    pub async fn describe(&self) -> Result<Vec<SignalMeta>> {
        let rows = sqlx::query(
            "SELECT signal_id, row_count, variables, created_at, updated_at FROM signals",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SignalMeta {
                signal_id: row.get("signal_id"),
                row_count: row.get("row_count"),
                variables: serde_json::from_str(row.get::<&str, _>("variables"))?,
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }
        Ok(out)
    }

    /// Lazy sequence of (id, table) pairs over the current contents.
    ///
    /// Finite and restartable: a fresh call re-traverses the store.
    /// Concurrent mutation during an open iteration has undefined
    /// ordering but never corrupts the container.
    pub fn iterate(&self) -> impl Stream<Item = Result<(SignalId, SignalTable)>> + '_ {
        async_stream::try_stream! {
            let ids = self.list_ids().await?;
            for id in ids {
                let table = self.get(&id).await?;
                yield (id, table);
            }
        }
    }
}
