use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::CharacterId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestState {
    #[default]
    NotStarted,
    Started,
    Completed,
}

/// One character's record of one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStatus {
    pub character_id: CharacterId,
    pub quest_id: u32,
    pub state: QuestState,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub completed_count: u32,
    pub forfeit_count: u32,
    /// Info number (mob or map id) to progress value.
    pub progress: BTreeMap<u32, String>,
}

impl QuestStatus {
    pub fn new(character_id: CharacterId, quest_id: u32) -> Self {
        Self {
            character_id,
            quest_id,
            state: QuestState::NotStarted,
            started_at: None,
            completed_at: None,
            expiration_time: None,
            completed_count: 0,
            forfeit_count: 0,
            progress: BTreeMap::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|expires| expires <= now)
    }

    pub fn progress_of(&self, info_number: u32) -> Option<&str> {
        self.progress.get(&info_number).map(String::as_str)
    }
}
