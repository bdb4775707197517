//! Persisted secret entities and the retrieval accounting rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameter triple produced by one encryption operation, hex-encoded.
/// Generated fresh per operation; a secret with an attached file carries two
/// independent triples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionParams {
    pub salt: String,
    pub nonce: String,
    pub auth_tag: String,
}

/// Encrypted file attached to a secret. Owned 1:1 by its record: deleting
/// the record deletes the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFile {
    /// Raw ciphertext bytes.
    pub data: Vec<u8>,
    pub original_file_name: String,
    pub params: EncryptionParams,
}

/// The persisted secret. Immutable after creation except for the two
/// counters, which only retrieval accounting touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: Uuid,
    /// Hex ciphertext of the text payload.
    pub encrypted_content: String,
    pub params: EncryptionParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<SecretFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Remaining retrievals; `None` means unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retrievals: Option<i64>,
    #[serde(default)]
    pub retrieval_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of applying the retrieval rules to an immutable record snapshot.
///
/// Pure data: the caller decides how to persist (update or remove), which
/// keeps the decrement-then-check step auditable without a live store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalAccounting {
    /// The budget was already spent. Remove the record; return no content.
    Exhausted,
    /// Counters advanced. Persist `record`; when `remove_after` is set the
    /// budget just reached zero and the record is removed once the response
    /// has been assembled.
    Proceed {
        record: SecretRecord,
        remove_after: bool,
    },
}

impl SecretRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.map(|d| d < now).unwrap_or(false)
    }

    /// Apply decrement-then-check accounting for one successful retrieval.
    pub fn account_retrieval(&self) -> RetrievalAccounting {
        if let Some(remaining) = self.max_retrievals {
            if remaining <= 0 {
                return RetrievalAccounting::Exhausted;
            }
        }

        let mut record = self.clone();
        record.max_retrievals = self.max_retrievals.map(|r| r - 1);
        record.retrieval_count += 1;
        let remove_after = record.max_retrievals == Some(0);

        RetrievalAccounting::Proceed {
            record,
            remove_after,
        }
    }
}

/// Listing projection: everything about a secret except its ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSummary {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retrievals: Option<i64>,
    pub retrieval_count: i64,
    pub has_file: bool,
    pub created_at: DateTime<Utc>,
}

/// Whitelisted sort columns for creator listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    ExpirationDate,
    RetrievalCount,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created_at" => Some(Self::CreatedAt),
            "expiration_date" => Some(Self::ExpirationDate),
            "retrieval_count" => Some(Self::RetrievalCount),
            _ => None,
        }
    }

    /// Column name for SQL backends. Only ever one of these literals, which
    /// is what makes interpolating it into a query safe.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::ExpirationDate => "expiration_date",
            Self::RetrievalCount => "retrieval_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(max_retrievals: Option<i64>) -> SecretRecord {
        SecretRecord {
            id: Uuid::new_v4(),
            encrypted_content: "00".into(),
            params: EncryptionParams {
                salt: "aa".into(),
                nonce: "bb".into(),
                auth_tag: "cc".into(),
            },
            file: None,
            expiration_date: None,
            max_retrievals,
            retrieval_count: 0,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unlimited_budget_never_exhausts() {
        match record(None).account_retrieval() {
            RetrievalAccounting::Proceed {
                record,
                remove_after,
            } => {
                assert_eq!(record.max_retrievals, None);
                assert_eq!(record.retrieval_count, 1);
                assert!(!remove_after);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn budget_decrements_without_removal_above_one() {
        match record(Some(2)).account_retrieval() {
            RetrievalAccounting::Proceed {
                record,
                remove_after,
            } => {
                assert_eq!(record.max_retrievals, Some(1));
                assert_eq!(record.retrieval_count, 1);
                assert!(!remove_after);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn last_retrieval_schedules_removal() {
        match record(Some(1)).account_retrieval() {
            RetrievalAccounting::Proceed {
                record,
                remove_after,
            } => {
                assert_eq!(record.max_retrievals, Some(0));
                assert!(remove_after);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn spent_budget_is_exhausted() {
        assert_eq!(
            record(Some(0)).account_retrieval(),
            RetrievalAccounting::Exhausted
        );
    }

    #[test]
    fn expiry_is_strictly_in_the_past() {
        let mut r = record(None);
        let now = Utc::now();
        assert!(!r.is_expired(now));

        r.expiration_date = Some(now - chrono::Duration::seconds(1));
        assert!(r.is_expired(now));

        r.expiration_date = Some(now + chrono::Duration::days(1));
        assert!(!r.is_expired(now));
    }

    #[test]
    fn sort_field_rejects_unknown_columns() {
        assert_eq!(SortField::parse("created_at"), Some(SortField::CreatedAt));
        assert_eq!(SortField::parse("id; DROP TABLE secrets"), None);
        assert_eq!(SortOrder::parse("DESC"), Some(SortOrder::Desc));
        assert_eq!(SortOrder::parse("sideways"), None);
    }
}
