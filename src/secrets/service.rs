//! Secret lifecycle orchestration.
//!
//! The only stateful component: it validates creation input, runs the
//! decrement-then-check retrieval accounting, enforces lazy expiration, and
//! deletes records whose budget or lifetime is spent. All mutating
//! operations on one secret are serialized through a per-ID async lock so
//! that two concurrent retrievals can never both spend the last unit of a
//! budget. The deliberately expensive KDF work runs on the blocking pool,
//! off the request-handling workers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::crypto::{CryptoError, EncryptionService};

use super::error::SecretError;
use super::store::SecretStore;
use super::types::{
    EncryptionParams, RetrievalAccounting, SecretFile, SecretRecord, SecretSummary, SortField,
    SortOrder,
};

/// Creation request, validated before any crypto or storage work.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub content: String,
    pub password: String,
    pub file: Option<NewSecretFile>,
    /// Days until expiry; must be positive when present.
    pub lifetime_days: Option<i64>,
    /// Retrieval budget; must be positive when present.
    pub max_retrievals: Option<i64>,
    pub created_by: Option<String>,
}

/// Plaintext file attached to a creation request.
#[derive(Debug, Clone)]
pub struct NewSecretFile {
    pub data: Vec<u8>,
    pub original_file_name: String,
}

/// Decrypted secret handed back to the caller.
#[derive(Debug, Clone)]
pub struct RetrievedSecret {
    pub id: Uuid,
    pub content: String,
    pub file: Option<RetrievedFile>,
    pub expiration_date: Option<DateTime<Utc>>,
    /// Remaining budget after this retrieval.
    pub max_retrievals: Option<i64>,
    pub retrieval_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Decrypted file payload.
#[derive(Debug, Clone)]
pub struct RetrievedFile {
    pub data: Vec<u8>,
    pub original_file_name: String,
}

/// One page of a creator listing.
#[derive(Debug, Clone, Serialize)]
pub struct SecretPage {
    pub data: Vec<SecretSummary>,
    pub total: u64,
}

/// Published on every successful retrieval for external collaborators
/// (notification, geo-IP). The service itself performs no lookups.
#[derive(Debug, Clone, Serialize)]
pub struct AccessEvent {
    pub secret_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

pub struct SecretService {
    store: Arc<dyn SecretStore>,
    crypto: Arc<EncryptionService>,
    /// Per-secret serialization points for lifecycle-mutating operations.
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    access_tx: broadcast::Sender<AccessEvent>,
}

impl SecretService {
    pub fn new(store: Arc<dyn SecretStore>, crypto: Arc<EncryptionService>) -> Self {
        let (access_tx, _) = broadcast::channel(64);
        Self {
            store,
            crypto,
            locks: Mutex::new(HashMap::new()),
            access_tx,
        }
    }

    /// Subscribe to access events. Receivers that fall behind miss events;
    /// delivery is best-effort by contract.
    pub fn subscribe_access_events(&self) -> broadcast::Receiver<AccessEvent> {
        self.access_tx.subscribe()
    }

    /// Validate, encrypt (content and file independently), and persist a new
    /// secret. Returns its ID.
    pub async fn create(&self, request: NewSecret) -> Result<Uuid, SecretError> {
        if request.content.is_empty() || request.password.is_empty() {
            return Err(SecretError::Validation(
                "Content and password are required".to_string(),
            ));
        }
        if let Some(max) = request.max_retrievals {
            if max <= 0 {
                return Err(SecretError::Validation(format!(
                    "Invalid max_retrievals value: {}. It must be a positive number.",
                    max
                )));
            }
        }
        let expiration_date = match request.lifetime_days {
            None => None,
            Some(days) if days <= 0 => {
                return Err(SecretError::Validation(
                    "Lifetime must be a positive number of days".to_string(),
                ));
            }
            Some(days) => Some(Utc::now() + chrono::Duration::days(days)),
        };

        let crypto = Arc::clone(&self.crypto);
        let password = request.password;
        let content = request.content;
        let file = request.file;
        let (content_payload, file_record) = tokio::task::spawn_blocking(move || {
            let content_payload = crypto.encrypt(content.as_bytes(), &password)?;
            let file_record = match file {
                Some(f) => {
                    // Independent salt, nonce, and tag for the file payload.
                    let payload = crypto.encrypt(&f.data, &password)?;
                    let data =
                        hex::decode(&payload.ciphertext).map_err(|_| CryptoError::Cipher)?;
                    Some(SecretFile {
                        data,
                        original_file_name: f.original_file_name,
                        params: EncryptionParams {
                            salt: payload.salt,
                            nonce: payload.nonce,
                            auth_tag: payload.auth_tag,
                        },
                    })
                }
                None => None,
            };
            Ok::<_, CryptoError>((content_payload, file_record))
        })
        .await
        .map_err(|e| SecretError::Storage(format!("Encryption task failed: {}", e)))??;

        let record = SecretRecord {
            id: Uuid::new_v4(),
            encrypted_content: content_payload.ciphertext,
            params: EncryptionParams {
                salt: content_payload.salt,
                nonce: content_payload.nonce,
                auth_tag: content_payload.auth_tag,
            },
            file: file_record,
            expiration_date,
            max_retrievals: request.max_retrievals,
            retrieval_count: 0,
            created_by: request.created_by,
            created_at: Utc::now(),
        };

        self.store
            .insert(&record)
            .await
            .map_err(SecretError::Storage)?;
        tracing::info!(secret_id = %record.id, has_file = record.file.is_some(), "secret created");
        Ok(record.id)
    }

    /// Retrieve and decrypt a secret.
    ///
    /// A wrong password fails before any accounting: it neither decrements
    /// the budget nor bumps the retrieval counter. Download-only fetches
    /// (the separate file stream) skip the budget entirely, since the
    /// canonical retrieval event is the primary content fetch; expiration
    /// still applies to them.
    pub async fn retrieve(
        &self,
        id: Uuid,
        password: &str,
        download_only: bool,
    ) -> Result<RetrievedSecret, SecretError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let record = self.load(id).await?;

        let (content, file) = self.decrypt_record(&record, password, true).await?;

        let mut current = record.clone();
        if !download_only {
            match record.account_retrieval() {
                RetrievalAccounting::Exhausted => {
                    self.remove(id).await?;
                    tracing::info!(secret_id = %id, "secret removed: retrieval budget spent");
                    return Err(SecretError::RetrievalsExhausted);
                }
                RetrievalAccounting::Proceed {
                    record: updated,
                    remove_after,
                } => {
                    if remove_after {
                        self.remove(id).await?;
                        tracing::info!(secret_id = %id, "secret removed after final retrieval");
                    } else {
                        self.store
                            .update_retrieval_counters(
                                id,
                                updated.max_retrievals,
                                updated.retrieval_count,
                            )
                            .await
                            .map_err(SecretError::Storage)?;
                    }
                    current = updated;
                }
            }
        }

        // Expired content is never returned, even though decryption (and,
        // for non-download calls, accounting) already happened.
        if current.is_expired(Utc::now()) {
            self.remove(id).await?;
            tracing::info!(secret_id = %id, "secret removed: expired");
            return Err(SecretError::NotFound);
        }

        let _ = self.access_tx.send(AccessEvent {
            secret_id: id,
            occurred_at: Utc::now(),
        });

        Ok(RetrievedSecret {
            id,
            content,
            file,
            expiration_date: current.expiration_date,
            max_retrievals: current.max_retrievals,
            retrieval_count: current.retrieval_count,
            created_at: current.created_at,
        })
    }

    /// Delete a secret, using a successful decryption of its content as
    /// proof of password possession. Does not touch retrieval accounting.
    pub async fn delete(&self, id: Uuid, password: &str) -> Result<(), SecretError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let record = self.load(id).await?;

        self.decrypt_record(&record, password, false).await?;
        self.remove(id).await?;
        tracing::info!(secret_id = %id, "secret deleted by creator");
        Ok(())
    }

    /// Total number of stored secrets.
    pub async fn count(&self) -> Result<u64, SecretError> {
        self.store.count().await.map_err(SecretError::Storage)
    }

    /// Page of summaries for one creator. Read-only; no lifecycle effect.
    pub async fn list_by_creator(
        &self,
        created_by: &str,
        page: u64,
        limit: u64,
        sort: SortField,
        order: SortOrder,
    ) -> Result<SecretPage, SecretError> {
        if created_by.trim().is_empty() {
            return Err(SecretError::Validation("Email is required".to_string()));
        }
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let (data, total) = self
            .store
            .list_by_creator(created_by, page, limit, sort, order)
            .await
            .map_err(SecretError::Storage)?;
        Ok(SecretPage { data, total })
    }

    async fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }

    /// Load a record while holding its lock. Unknown IDs also drop the lock
    /// entry, so probing random IDs cannot grow the lock map.
    async fn load(&self, id: Uuid) -> Result<SecretRecord, SecretError> {
        match self.store.get(id).await.map_err(SecretError::Storage)? {
            Some(record) => Ok(record),
            None => {
                self.locks.lock().await.remove(&id);
                Err(SecretError::NotFound)
            }
        }
    }

    /// Remove the record and its serialization point. Tolerates the record
    /// already being gone.
    async fn remove(&self, id: Uuid) -> Result<(), SecretError> {
        self.store.delete(id).await.map_err(SecretError::Storage)?;
        self.locks.lock().await.remove(&id);
        Ok(())
    }

    async fn decrypt_record(
        &self,
        record: &SecretRecord,
        password: &str,
        include_file: bool,
    ) -> Result<(String, Option<RetrievedFile>), SecretError> {
        let crypto = Arc::clone(&self.crypto);
        let record = record.clone();
        let password = password.to_string();

        let (content, file) = tokio::task::spawn_blocking(move || {
            let content = crypto.decrypt(
                &record.encrypted_content,
                &password,
                &record.params.nonce,
                &record.params.salt,
                &record.params.auth_tag,
            )?;
            let file = match record.file.filter(|_| include_file) {
                Some(f) => Some(RetrievedFile {
                    data: crypto.decrypt_bytes(
                        &f.data,
                        &password,
                        &f.params.nonce,
                        &f.params.salt,
                        &f.params.auth_tag,
                    )?,
                    original_file_name: f.original_file_name,
                }),
                None => None,
            };
            Ok::<_, CryptoError>((content, file))
        })
        .await
        .map_err(|e| SecretError::Storage(format!("Decryption task failed: {}", e)))??;

        let content = String::from_utf8(content).map_err(|_| SecretError::InvalidPassword)?;
        Ok((content, file))
    }
}
