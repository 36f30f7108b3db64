use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A map instance within a world channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub world_id: u8,
    pub channel_id: u8,
    pub map_id: u32,
    /// Nil for the shared map; set for instanced copies (party quests, events).
    #[serde(default)]
    pub instance: Uuid,
}

impl Field {
    pub fn new(world_id: u8, channel_id: u8, map_id: u32) -> Self {
        Self {
            world_id,
            channel_id,
            map_id,
            instance: Uuid::nil(),
        }
    }

    pub fn with_instance(mut self, instance: Uuid) -> Self {
        self.instance = instance;
        self
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.world_id, self.channel_id, self.map_id, self.instance
        )
    }
}
