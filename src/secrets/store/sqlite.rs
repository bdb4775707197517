//! SQLite-based secret store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::super::types::{
    EncryptionParams, SecretFile, SecretRecord, SecretSummary, SortField, SortOrder,
};
use super::SecretStore;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS secrets (
    id TEXT PRIMARY KEY NOT NULL,
    encrypted_content TEXT NOT NULL,
    salt TEXT NOT NULL,
    nonce TEXT NOT NULL,
    auth_tag TEXT NOT NULL,
    expiration_date TEXT,
    max_retrievals INTEGER,
    retrieval_count INTEGER NOT NULL DEFAULT 0,
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_secrets_created_by ON secrets(created_by);

CREATE TABLE IF NOT EXISTS secret_files (
    secret_id TEXT PRIMARY KEY NOT NULL,
    data BLOB NOT NULL,
    original_file_name TEXT NOT NULL,
    salt TEXT NOT NULL,
    nonce TEXT NOT NULL,
    auth_tag TEXT NOT NULL,
    FOREIGN KEY (secret_id) REFERENCES secrets(id) ON DELETE CASCADE
);
"#;

pub struct SqliteSecretStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSecretStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create secret store dir: {}", e))?;
        let db_path = base_dir.join("secrets.db");

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;
            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_id(value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map one row of the secrets LEFT JOIN secret_files query.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SecretRecord> {
    let id: String = row.get(0)?;
    let expiration_date: Option<String> = row.get(5)?;
    let created_at: String = row.get(9)?;

    let file = match row.get::<_, Option<Vec<u8>>>(10)? {
        Some(data) => Some(SecretFile {
            data,
            original_file_name: row.get(11)?,
            params: EncryptionParams {
                salt: row.get(12)?,
                nonce: row.get(13)?,
                auth_tag: row.get(14)?,
            },
        }),
        None => None,
    };

    Ok(SecretRecord {
        id: parse_id(&id)?,
        encrypted_content: row.get(1)?,
        params: EncryptionParams {
            salt: row.get(2)?,
            nonce: row.get(3)?,
            auth_tag: row.get(4)?,
        },
        file,
        expiration_date: expiration_date.as_deref().map(parse_timestamp).transpose()?,
        max_retrievals: row.get(6)?,
        retrieval_count: row.get(7)?,
        created_by: row.get(8)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

const SELECT_RECORD: &str = "
    SELECT s.id, s.encrypted_content, s.salt, s.nonce, s.auth_tag,
           s.expiration_date, s.max_retrievals, s.retrieval_count, s.created_by, s.created_at,
           f.data, f.original_file_name, f.salt, f.nonce, f.auth_tag
    FROM secrets s
    LEFT JOIN secret_files f ON f.secret_id = s.id
    WHERE s.id = ?1";

#[async_trait]
impl SecretStore for SqliteSecretStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert(&self, record: &SecretRecord) -> Result<(), String> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| format!("Failed to start transaction: {}", e))?;

        tx.execute(
            "INSERT INTO secrets (id, encrypted_content, salt, nonce, auth_tag,
                                  expiration_date, max_retrievals, retrieval_count, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id.to_string(),
                record.encrypted_content,
                record.params.salt,
                record.params.nonce,
                record.params.auth_tag,
                record.expiration_date.map(|d| d.to_rfc3339()),
                record.max_retrievals,
                record.retrieval_count,
                record.created_by,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Failed to insert secret: {}", e))?;

        if let Some(file) = &record.file {
            tx.execute(
                "INSERT INTO secret_files (secret_id, data, original_file_name, salt, nonce, auth_tag)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.to_string(),
                    file.data,
                    file.original_file_name,
                    file.params.salt,
                    file.params.nonce,
                    file.params.auth_tag,
                ],
            )
            .map_err(|e| format!("Failed to insert secret file: {}", e))?;
        }

        tx.commit()
            .map_err(|e| format!("Failed to commit secret: {}", e))
    }

    async fn get(&self, id: Uuid) -> Result<Option<SecretRecord>, String> {
        let conn = self.conn.lock().await;
        conn.query_row(SELECT_RECORD, params![id.to_string()], row_to_record)
            .optional()
            .map_err(|e| format!("Failed to load secret: {}", e))
    }

    async fn update_retrieval_counters(
        &self,
        id: Uuid,
        max_retrievals: Option<i64>,
        retrieval_count: i64,
    ) -> Result<(), String> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE secrets SET max_retrievals = ?2, retrieval_count = ?3 WHERE id = ?1",
                params![id.to_string(), max_retrievals, retrieval_count],
            )
            .map_err(|e| format!("Failed to update counters: {}", e))?;
        if changed == 0 {
            return Err(format!("Secret {} not found", id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, String> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("DELETE FROM secrets WHERE id = ?1", params![id.to_string()])
            .map_err(|e| format!("Failed to delete secret: {}", e))?;
        Ok(changed > 0)
    }

    async fn count(&self) -> Result<u64, String> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT COUNT(*) FROM secrets", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
        .map_err(|e| format!("Failed to count secrets: {}", e))
    }

    async fn list_by_creator(
        &self,
        created_by: &str,
        page: u64,
        limit: u64,
        sort: SortField,
        order: SortOrder,
    ) -> Result<(Vec<SecretSummary>, u64), String> {
        let conn = self.conn.lock().await;

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM secrets WHERE created_by = ?1",
                params![created_by],
                |row| row.get(0),
            )
            .map_err(|e| format!("Failed to count creator secrets: {}", e))?;

        // sort/order come from whitelisted enums, never from the request.
        let query = format!(
            "SELECT s.id, s.expiration_date, s.max_retrievals, s.retrieval_count, s.created_at,
                    EXISTS(SELECT 1 FROM secret_files f WHERE f.secret_id = s.id)
             FROM secrets s
             WHERE s.created_by = ?1
             ORDER BY s.{} {}
             LIMIT ?2 OFFSET ?3",
            sort.column(),
            order.keyword()
        );

        let offset = page.saturating_sub(1).saturating_mul(limit);
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| format!("Failed to prepare listing: {}", e))?;
        let summaries = stmt
            .query_map(params![created_by, limit as i64, offset as i64], |row| {
                let id: String = row.get(0)?;
                let expiration_date: Option<String> = row.get(1)?;
                let created_at: String = row.get(4)?;
                Ok(SecretSummary {
                    id: parse_id(&id)?,
                    expiration_date: expiration_date.as_deref().map(parse_timestamp).transpose()?,
                    max_retrievals: row.get(2)?,
                    retrieval_count: row.get(3)?,
                    has_file: row.get(5)?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .map_err(|e| format!("Failed to list secrets: {}", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| format!("Failed to read listing rows: {}", e))?;

        Ok((summaries, total as u64))
    }
}
