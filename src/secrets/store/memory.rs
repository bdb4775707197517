//! In-memory secret store (non-persistent).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::super::types::{SecretRecord, SecretSummary, SortField, SortOrder};
use super::{summarize, SecretStore};

#[derive(Clone, Default)]
pub struct InMemorySecretStore {
    records: Arc<RwLock<HashMap<Uuid, SecretRecord>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn insert(&self, record: &SecretRecord) -> Result<(), String> {
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SecretRecord>, String> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn update_retrieval_counters(
        &self,
        id: Uuid,
        max_retrievals: Option<i64>,
        retrieval_count: i64,
    ) -> Result<(), String> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| format!("Secret {} not found", id))?;
        record.max_retrievals = max_retrievals;
        record.retrieval_count = retrieval_count;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, String> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> Result<u64, String> {
        Ok(self.records.read().await.len() as u64)
    }

    async fn list_by_creator(
        &self,
        created_by: &str,
        page: u64,
        limit: u64,
        sort: SortField,
        order: SortOrder,
    ) -> Result<(Vec<SecretSummary>, u64), String> {
        let records = self.records.read().await;
        let mut matching: Vec<&SecretRecord> = records
            .values()
            .filter(|r| r.created_by.as_deref() == Some(created_by))
            .collect();
        let total = matching.len() as u64;

        matching.sort_by(|a, b| {
            let ordering = match sort {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::ExpirationDate => a.expiration_date.cmp(&b.expiration_date),
                SortField::RetrievalCount => a.retrieval_count.cmp(&b.retrieval_count),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let offset = page.saturating_sub(1).saturating_mul(limit) as usize;
        let summaries = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(summarize)
            .collect();

        Ok((summaries, total))
    }
}
