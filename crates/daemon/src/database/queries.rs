use sqlx::{Row, SqliteConnection};
use time::OffsetDateTime;

use super::Database;

/// A logical versioned file, unique by path.
///
/// Never deleted: removing the file on disk does not remove its history.
#[derive(Debug, Clone)]
pub struct TrackedFile {
    pub id: i64,
    pub path: String,
    pub display_name: String,
    pub last_hash: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Metadata for one immutable captured snapshot.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version_number: i64,
    pub created_at: OffsetDateTime,
}

fn from_unix(secs: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn file_from_row(row: &sqlx::sqlite::SqliteRow) -> TrackedFile {
    TrackedFile {
        id: row.get("id"),
        path: row.get("path"),
        display_name: row.get("display_name"),
        last_hash: row.get("last_hash"),
        created_at: from_unix(row.get("created_at")),
    }
}

impl Database {
    /// List every tracked file, newest first.
    pub async fn list_files(&self) -> Result<Vec<TrackedFile>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, path, display_name, last_hash, created_at
            FROM files
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&**self)
        .await?;

        Ok(rows.iter().map(file_from_row).collect())
    }

    /// Get one tracked file by id.
    pub async fn get_file(&self, id: i64) -> Result<Option<TrackedFile>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, path, display_name, last_hash, created_at
            FROM files
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&**self)
        .await?;

        Ok(row.as_ref().map(file_from_row))
    }

    /// List version metadata for a file, highest version first.
    pub async fn list_versions(&self, file_id: i64) -> Result<Vec<VersionInfo>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT version_number, created_at
            FROM versions
            WHERE file_id = ?
            ORDER BY version_number DESC
            "#,
        )
        .bind(file_id)
        .fetch_all(&**self)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VersionInfo {
                version_number: r.get("version_number"),
                created_at: from_unix(r.get("created_at")),
            })
            .collect())
    }

    /// Fetch one version's sealed payload.
    pub async fn get_version_payload(
        &self,
        file_id: i64,
        version_number: i64,
    ) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT payload
            FROM versions
            WHERE file_id = ? AND version_number = ?
            "#,
        )
        .bind(file_id)
        .bind(version_number)
        .fetch_optional(&**self)
        .await?;

        Ok(row.map(|r| r.get("payload")))
    }

    /// Overwrite a file's stored content hash.
    pub async fn update_file_hash(&self, file_id: i64, hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE files SET last_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(file_id)
            .execute(&**self)
            .await?;
        Ok(())
    }

    /// Bulk-delete versions created strictly before the cutoff.
    ///
    /// Returns the number of versions removed. Tracked files survive even
    /// when all their versions are purged.
    pub async fn delete_versions_older_than(&self, cutoff: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM versions WHERE created_at < ?")
            .bind(cutoff)
            .execute(&**self)
            .await?;
        Ok(result.rows_affected())
    }
}

// Transaction-scoped queries used by the capture pipeline. These take a
// bare connection so the whole read-check-insert sequence runs in one
// atomic unit of work.

pub(crate) async fn find_file_by_path(
    conn: &mut SqliteConnection,
    path: &str,
) -> Result<Option<(i64, Option<String>)>, sqlx::Error> {
    let row = sqlx::query("SELECT id, last_hash FROM files WHERE path = ?")
        .bind(path)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(|r| (r.get("id"), r.get("last_hash"))))
}

pub(crate) async fn insert_file(
    conn: &mut SqliteConnection,
    path: &str,
    display_name: &str,
    now: i64,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO files (path, display_name, last_hash, created_at)
        VALUES (?, ?, NULL, ?)
        "#,
    )
    .bind(path)
    .bind(display_name)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub(crate) async fn next_version_number(
    conn: &mut SqliteConnection,
    file_id: i64,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COALESCE(MAX(version_number), 0) + 1 AS next FROM versions WHERE file_id = ?",
    )
    .bind(file_id)
    .fetch_one(conn)
    .await?;

    Ok(row.get("next"))
}

pub(crate) async fn insert_version(
    conn: &mut SqliteConnection,
    file_id: i64,
    version_number: i64,
    payload: &[u8],
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO versions (file_id, version_number, payload, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(file_id)
    .bind(version_number)
    .bind(payload)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn set_file_hash(
    conn: &mut SqliteConnection,
    file_id: i64,
    hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET last_hash = ? WHERE id = ?")
        .bind(hash)
        .bind(file_id)
        .execute(conn)
        .await?;
    Ok(())
}
