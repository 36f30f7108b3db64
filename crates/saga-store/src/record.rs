use chrono::{DateTime, Utc};
use common::{Tenant, TransactionId};
use serde::{Deserialize, Serialize};

use crate::Version;

/// Lifecycle status of a persisted saga.
///
/// ```text
/// Active ──┬──► Completed
///          └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SagaStatus {
    /// Steps are being advanced.
    #[default]
    Active,

    /// A step failed and completed steps are being reversed.
    Compensating,

    /// Every step completed (terminal).
    Completed,

    /// Compensation finished or was abandoned (terminal).
    Failed,
}

impl SagaStatus {
    /// Returns true for sagas that still live in the cache.
    pub fn is_live(&self) -> bool {
        matches!(self, SagaStatus::Active | SagaStatus::Compensating)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Completed | SagaStatus::Failed)
    }

    /// Returns the status as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Active => "active",
            SagaStatus::Compensating => "compensating",
            SagaStatus::Completed => "completed",
            SagaStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SagaStatus::Active),
            "compensating" => Some(SagaStatus::Compensating),
            "completed" => Some(SagaStatus::Completed),
            "failed" => Some(SagaStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted saga.
///
/// `version` is the version the writer last read: [`Version::initial`] for a
/// saga that has never been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaRecord {
    pub tenant: Tenant,
    pub transaction_id: TransactionId,
    pub saga_type: String,
    pub initiated_by: String,
    pub status: SagaStatus,
    /// Serialized saga body, opaque to the store.
    pub data: serde_json::Value,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub timeout_at: DateTime<Utc>,
}

impl SagaRecord {
    /// Returns true once `timeout_at` has passed.
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.timeout_at < now
    }
}
