//! Secret storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database (default)

mod memory;
mod sqlite;

pub use memory::InMemorySecretStore;
pub use sqlite::SqliteSecretStore;

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use super::types::{SecretRecord, SecretSummary, SortField, SortOrder};

/// Secret store trait - implemented by all storage backends.
///
/// Backends persist records verbatim; every lifecycle rule (accounting,
/// expiry, deletion-on-exhaustion) lives in the service above them.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Persist a freshly created record.
    async fn insert(&self, record: &SecretRecord) -> Result<(), String>;

    /// Load a record (including its file, if any) by ID.
    async fn get(&self, id: Uuid) -> Result<Option<SecretRecord>, String>;

    /// Persist the counters after one successful retrieval. The only update
    /// path a stored record has.
    async fn update_retrieval_counters(
        &self,
        id: Uuid,
        max_retrievals: Option<i64>,
        retrieval_count: i64,
    ) -> Result<(), String>;

    /// Remove a record and its owned file. Returns whether anything existed.
    async fn delete(&self, id: Uuid) -> Result<bool, String>;

    /// Total number of stored secrets.
    async fn count(&self) -> Result<u64, String>;

    /// Page of summaries for one creator plus the creator's total.
    /// `page` is 1-based.
    async fn list_by_creator(
        &self,
        created_by: &str,
        page: u64,
        limit: u64,
        sort: SortField,
        order: SortOrder,
    ) -> Result<(Vec<SecretSummary>, u64), String>;
}

/// Secret store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl SecretStoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a secret store based on type and configuration.
pub async fn create_secret_store(
    store_type: SecretStoreType,
    base_dir: PathBuf,
) -> Result<Box<dyn SecretStore>, String> {
    match store_type {
        SecretStoreType::Memory => Ok(Box::new(InMemorySecretStore::new())),
        SecretStoreType::Sqlite => {
            let store = SqliteSecretStore::new(base_dir).await?;
            Ok(Box::new(store))
        }
    }
}

pub(crate) fn summarize(record: &SecretRecord) -> SecretSummary {
    SecretSummary {
        id: record.id,
        expiration_date: record.expiration_date,
        max_retrievals: record.max_retrievals,
        retrieval_count: record.retrieval_count,
        has_file: record.file.is_some(),
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::EncryptionParams;
    use super::*;
    use chrono::{Duration, Utc};

    fn params(tag: &str) -> EncryptionParams {
        EncryptionParams {
            salt: format!("{}salt", tag),
            nonce: format!("{}nonce", tag),
            auth_tag: format!("{}tag", tag),
        }
    }

    fn record(created_by: Option<&str>) -> SecretRecord {
        SecretRecord {
            id: Uuid::new_v4(),
            encrypted_content: "deadbeef".into(),
            params: params("content"),
            file: None,
            expiration_date: None,
            max_retrievals: Some(3),
            retrieval_count: 0,
            created_by: created_by.map(|s| s.to_string()),
            created_at: Utc::now(),
        }
    }

    async fn exercise_roundtrip(store: &dyn SecretStore) {
        let mut rec = record(Some("alice@example.com"));
        rec.file = Some(super::super::types::SecretFile {
            data: vec![1, 2, 3, 4],
            original_file_name: "notes.txt".into(),
            params: params("file"),
        });
        rec.expiration_date = Some(Utc::now() + Duration::days(2));

        store.insert(&rec).await.unwrap();
        let loaded = store.get(rec.id).await.unwrap().expect("record missing");
        assert_eq!(loaded, rec);

        // Counters are the only mutable surface.
        store
            .update_retrieval_counters(rec.id, Some(2), 1)
            .await
            .unwrap();
        let loaded = store.get(rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.max_retrievals, Some(2));
        assert_eq!(loaded.retrieval_count, 1);
        assert_eq!(loaded.encrypted_content, rec.encrypted_content);

        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.delete(rec.id).await.unwrap());
        assert!(store.get(rec.id).await.unwrap().is_none());
        assert!(!store.delete(rec.id).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    async fn exercise_listing(store: &dyn SecretStore) {
        for i in 0..5 {
            let mut rec = record(Some("bob@example.com"));
            rec.retrieval_count = i;
            rec.created_at = Utc::now() + Duration::seconds(i);
            store.insert(&rec).await.unwrap();
        }
        store.insert(&record(Some("carol@example.com"))).await.unwrap();
        store.insert(&record(None)).await.unwrap();

        let (page, total) = store
            .list_by_creator(
                "bob@example.com",
                1,
                2,
                SortField::RetrievalCount,
                SortOrder::Desc,
            )
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].retrieval_count, 4);
        assert_eq!(page[1].retrieval_count, 3);

        let (page, _) = store
            .list_by_creator(
                "bob@example.com",
                3,
                2,
                SortField::RetrievalCount,
                SortOrder::Desc,
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].retrieval_count, 0);

        let (page, total) = store
            .list_by_creator("nobody@example.com", 1, 10, SortField::default(), SortOrder::default())
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        exercise_roundtrip(&InMemorySecretStore::new()).await;
    }

    #[tokio::test]
    async fn memory_store_listing() {
        exercise_listing(&InMemorySecretStore::new()).await;
    }

    #[tokio::test]
    async fn sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSecretStore::new(dir.path().to_path_buf()).await.unwrap();
        exercise_roundtrip(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSecretStore::new(dir.path().to_path_buf()).await.unwrap();
        exercise_listing(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(None);
        {
            let store = SqliteSecretStore::new(dir.path().to_path_buf()).await.unwrap();
            assert!(store.is_persistent());
            store.insert(&rec).await.unwrap();
        }
        let store = SqliteSecretStore::new(dir.path().to_path_buf()).await.unwrap();
        let loaded = store.get(rec.id).await.unwrap().unwrap();
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn counter_update_on_unknown_id_errors() {
        let store = InMemorySecretStore::new();
        assert!(store
            .update_retrieval_counters(Uuid::new_v4(), Some(1), 1)
            .await
            .is_err());
    }
}
