use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Static quest data served by the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDefinition {
    pub id: u32,
    /// Completes as soon as its kill and visit requirements are met.
    #[serde(default)]
    pub auto_complete: bool,
    /// Starts automatically when the character enters one of these maps.
    #[serde(default)]
    pub auto_start_maps: Vec<u32>,
    /// Minimum time between completions of a repeatable quest.
    #[serde(default, with = "minutes")]
    pub repeat_interval: Option<Duration>,
    /// Time allowed between start and completion.
    #[serde(default, with = "minutes")]
    pub time_limit: Option<Duration>,
    #[serde(default)]
    pub next_quest_id: Option<u32>,
    /// Monster id to required kill count.
    #[serde(default)]
    pub mob_requirements: BTreeMap<u32, u32>,
    /// Maps that must be visited.
    #[serde(default)]
    pub map_requirements: Vec<u32>,
}

impl QuestDefinition {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            auto_complete: false,
            auto_start_maps: Vec::new(),
            repeat_interval: None,
            time_limit: None,
            next_quest_id: None,
            mob_requirements: BTreeMap::new(),
            map_requirements: Vec::new(),
        }
    }

    pub fn auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    pub fn auto_start_on(mut self, map_id: u32) -> Self {
        self.auto_start_maps.push(map_id);
        self
    }

    pub fn repeatable(mut self, interval: Duration) -> Self {
        self.repeat_interval = Some(interval);
        self
    }

    pub fn time_limited(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn chained_to(mut self, next_quest_id: u32) -> Self {
        self.next_quest_id = Some(next_quest_id);
        self
    }

    pub fn requires_kills(mut self, mob_id: u32, count: u32) -> Self {
        self.mob_requirements.insert(mob_id, count);
        self
    }

    pub fn requires_visit(mut self, map_id: u32) -> Self {
        self.map_requirements.push(map_id);
        self
    }

    /// Progress rows a fresh start begins with: `000` per mob, `0` per map.
    pub fn initial_progress(&self) -> BTreeMap<u32, String> {
        let mobs = self
            .mob_requirements
            .keys()
            .map(|mob_id| (*mob_id, "000".to_string()));
        let maps = self
            .map_requirements
            .iter()
            .map(|map_id| (*map_id, "0".to_string()));
        mobs.chain(maps).collect()
    }

    /// Kill and visit requirements are satisfied by `progress`.
    ///
    /// Item requirements are not considered.
    pub fn requirements_met(&self, progress: &BTreeMap<u32, String>) -> bool {
        let kills = self.mob_requirements.iter().all(|(mob_id, required)| {
            progress
                .get(mob_id)
                .and_then(|count| count.parse::<u32>().ok())
                .is_some_and(|count| count >= *required)
        });
        let visits = self
            .map_requirements
            .iter()
            .all(|map_id| progress.get(map_id).is_some_and(|flag| flag == "1"));
        kills && visits
    }
}

/// Source of quest definitions.
pub trait QuestDefinitionProvider: Send + Sync {
    fn definition(&self, quest_id: u32) -> Option<QuestDefinition>;

    /// Quests that start automatically on `map_id`.
    fn auto_start_on(&self, map_id: u32) -> Vec<QuestDefinition>;
}

/// Quest definitions held in memory, seeded at start-up.
#[derive(Debug, Clone, Default)]
pub struct StaticQuestDefinitions {
    definitions: HashMap<u32, QuestDefinition>,
}

impl StaticQuestDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, definition: QuestDefinition) -> Self {
        self.definitions.insert(definition.id, definition);
        self
    }
}

impl QuestDefinitionProvider for StaticQuestDefinitions {
    fn definition(&self, quest_id: u32) -> Option<QuestDefinition> {
        self.definitions.get(&quest_id).cloned()
    }

    fn auto_start_on(&self, map_id: u32) -> Vec<QuestDefinition> {
        let mut quests: Vec<QuestDefinition> = self
            .definitions
            .values()
            .filter(|d| d.auto_start_maps.contains(&map_id))
            .cloned()
            .collect();
        quests.sort_by_key(|d| d.id);
        quests
    }
}

mod minutes {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.num_minutes()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::minutes))
    }
}
