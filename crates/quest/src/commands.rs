use common::{CharacterId, TransactionId};
use serde::{Deserialize, Serialize};

/// Command consumed from `command.quest`, keyed by character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestCommand {
    pub transaction_id: TransactionId,
    pub character_id: CharacterId,
    /// Step this command serves, echoed on the resulting status event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: QuestCommandKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum QuestCommandKind {
    Start {
        quest_id: u32,
        /// Started as the continuation of a chain; skips the repeat interval.
        #[serde(default)]
        chained: bool,
    },
    Complete {
        quest_id: u32,
        /// Start the chain's next quest right away.
        #[serde(default)]
        start_next: bool,
    },
    Forfeit {
        quest_id: u32,
    },
    SetProgress {
        quest_id: u32,
        info_number: u32,
        progress: String,
    },
    MonsterKilled {
        monster_id: u32,
    },
    MapEntered {
        map_id: u32,
    },
}

impl QuestCommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestCommandKind::Start { .. } => "START",
            QuestCommandKind::Complete { .. } => "COMPLETE",
            QuestCommandKind::Forfeit { .. } => "FORFEIT",
            QuestCommandKind::SetProgress { .. } => "SET_PROGRESS",
            QuestCommandKind::MonsterKilled { .. } => "MONSTER_KILLED",
            QuestCommandKind::MapEntered { .. } => "MAP_ENTERED",
        }
    }

    /// Quest addressed by the command, if it names one.
    pub fn quest_id(&self) -> Option<u32> {
        match self {
            QuestCommandKind::Start { quest_id, .. }
            | QuestCommandKind::Complete { quest_id, .. }
            | QuestCommandKind::Forfeit { quest_id }
            | QuestCommandKind::SetProgress { quest_id, .. } => Some(*quest_id),
            QuestCommandKind::MonsterKilled { .. } | QuestCommandKind::MapEntered { .. } => None,
        }
    }
}
