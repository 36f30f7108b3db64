//! Commands and status events exchanged with services that own no engine in
//! this workspace (character, guild, storage, cash shop, monster, portal,
//! messaging and reactor state).

use common::{CharacterId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::Action;

/// A saga action forwarded verbatim to the owning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCommand {
    pub transaction_id: TransactionId,
    pub character_id: CharacterId,
    /// Step this command serves, echoed on the resulting status event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub action: Action,
}

/// Outcome reported by an external service on `event.character-status`,
/// keyed by character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatusEvent {
    pub transaction_id: TransactionId,
    pub character_id: CharacterId,
    /// Echo of the command's correlation id, if it carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: ServiceStatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServiceStatusKind {
    Completed {
        /// Action name that completed, e.g. `award_mesos`.
        action: String,
    },
    Error {
        action: String,
        error_code: String,
        reason: String,
    },
}

impl ServiceStatusKind {
    pub fn action(&self) -> &str {
        match self {
            ServiceStatusKind::Completed { action } | ServiceStatusKind::Error { action, .. } => {
                action
            }
        }
    }
}
