use common::{CharacterId, TransactionId};
use serde::{Deserialize, Serialize};

/// Status event published on `event.quest-status`, keyed by character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStatusEvent {
    pub transaction_id: TransactionId,
    pub character_id: CharacterId,
    pub quest_id: u32,
    /// Echo of the command's correlation id, if it carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: QuestStatusKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum QuestStatusKind {
    Started,
    Completed {
        next_quest_id: Option<u32>,
    },
    Forfeited,
    ProgressUpdated {
        info_number: u32,
        progress: String,
    },
    /// A quest command was refused.
    Error {
        command: String,
        error_code: String,
        reason: String,
    },
}

impl QuestStatusEvent {
    pub fn new(
        transaction_id: TransactionId,
        character_id: CharacterId,
        quest_id: u32,
        kind: QuestStatusKind,
    ) -> Self {
        Self {
            transaction_id,
            character_id,
            quest_id,
            correlation_id: None,
            kind,
        }
    }

    /// Tags the event with the correlation id of the command that caused it.
    pub fn correlated(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_wire_shape() {
        let tx = TransactionId::new();
        let event = QuestStatusEvent::new(
            tx,
            12345,
            2000,
            QuestStatusKind::ProgressUpdated {
                info_number: 100100,
                progress: "003".to_string(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PROGRESS_UPDATED");
        assert_eq!(json["questId"], 2000);
        assert_eq!(json["body"]["infoNumber"], 100100);
        assert_eq!(json["body"]["progress"], "003");
    }
}
