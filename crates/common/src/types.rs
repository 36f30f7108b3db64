use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation identifier carried by every saga, command and status event.
///
/// Wraps a UUID so transaction ids cannot be confused with tenant ids
/// or other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new random transaction ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a transaction ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for TransactionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<TransactionId> for Uuid {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

/// Where a command came from: its transaction plus the correlation id the
/// resulting status events must echo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub transaction_id: TransactionId,
    pub correlation_id: Option<String>,
}

impl Origin {
    pub fn new(transaction_id: TransactionId, correlation_id: Option<String>) -> Self {
        Self {
            transaction_id,
            correlation_id,
        }
    }
}

impl From<TransactionId> for Origin {
    fn from(transaction_id: TransactionId) -> Self {
        Self::new(transaction_id, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_new_creates_unique_ids() {
        let id1 = TransactionId::new();
        let id2 = TransactionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn transaction_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = TransactionId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn transaction_id_parses_from_string() {
        let id = TransactionId::new();
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<TransactionId>().is_err());
    }

    #[test]
    fn transaction_id_serializes_as_plain_uuid() {
        let id = TransactionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }

    #[test]
    fn bare_transaction_is_an_uncorrelated_origin() {
        let id = TransactionId::new();
        let origin = Origin::from(id);
        assert_eq!(origin.transaction_id, id);
        assert!(origin.correlation_id.is_none());
    }
}
