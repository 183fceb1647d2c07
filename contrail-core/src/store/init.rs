//! Container initialization
//!
//! One SQLite file per store. Writable opens are idempotent: pragmas and
//! `CREATE TABLE IF NOT EXISTS` run on every open.

use crate::store::OpenMode;
use crate::{Error, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub(crate) async fn open_pool(path: &Path, mode: OpenMode) -> Result<SqlitePool> {
    let unavailable = |reason: String| Error::StoreUnavailable {
        location: path.display().to_string(),
        reason,
    };

    let url = match mode {
        OpenMode::ReadOnly => {
            if !path.exists() {
                return Err(unavailable("no such container".to_string()));
            }
            format!("sqlite://{}?mode=ro", path.display())
        }
        OpenMode::ReadWrite => {
            if !path.exists() {
                return Err(unavailable("no such container".to_string()));
            }
            format!("sqlite://{}?mode=rw", path.display())
        }
        OpenMode::Create { overwrite } => {
            if path.exists() {
                if !overwrite {
                    return Err(unavailable(
                        "container already exists (pass overwrite to replace it)".to_string(),
                    ));
                }
                remove_container_files(path)?;
                debug!(path = %path.display(), "removed existing container for overwrite");
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            format!("sqlite://{}?mode=rwc", path.display())
        }
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    if !matches!(mode, OpenMode::ReadOnly) {
        // WAL allows concurrent readers alongside the single writer.
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;
        create_meta_table(&pool).await?;
        create_signals_table(&pool).await?;
        create_columns_table(&pool).await?;
    }

    info!(path = %path.display(), ?mode, "opened signal store");
    Ok(pool)
}

/// Remove the container plus SQLite's WAL/SHM sidecar files.
fn remove_container_files(path: &Path) -> Result<()> {
    std::fs::remove_file(path)?;
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        let sidecar = Path::new(&sidecar);
        if sidecar.exists() {
            std::fs::remove_file(sidecar)?;
        }
    }
    Ok(())
}

async fn create_meta_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_signals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS signals (
            signal_id TEXT PRIMARY KEY,
            row_count INTEGER NOT NULL,
            variables TEXT NOT NULL,
            positions BLOB NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (row_count > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_columns_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS signal_columns (
            signal_id TEXT NOT NULL REFERENCES signals(signal_id) ON DELETE CASCADE,
            variable TEXT NOT NULL,
            data BLOB NOT NULL,
            PRIMARY KEY (signal_id, variable)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_signal_columns_signal ON signal_columns(signal_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
