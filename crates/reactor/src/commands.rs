use common::{CharacterId, Field};
use serde::{Deserialize, Serialize};

/// Command on `command.reactor-actions`, published by the reactor service
/// when a reactor is hit or reaches its trigger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorCommand {
    pub world_id: u8,
    pub channel_id: u8,
    pub map_id: u32,
    pub reactor_id: u32,
    pub classification: String,
    #[serde(default)]
    pub reactor_name: String,
    pub reactor_state: i8,
    pub x: i16,
    pub y: i16,
    #[serde(flatten)]
    pub kind: ReactorCommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ReactorCommandKind {
    Hit {
        character_id: CharacterId,
        #[serde(default)]
        skill_id: u32,
        #[serde(default)]
        is_skill: bool,
    },
    Trigger {
        character_id: CharacterId,
    },
}

impl ReactorCommand {
    pub fn field(&self) -> Field {
        Field::new(self.world_id, self.channel_id, self.map_id)
    }

    pub fn character_id(&self) -> CharacterId {
        match self.kind {
            ReactorCommandKind::Hit { character_id, .. }
            | ReactorCommandKind::Trigger { character_id } => character_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hit_command() {
        let json = serde_json::json!({
            "worldId": 0,
            "channelId": 1,
            "mapId": 108000600,
            "reactorId": 55,
            "classification": "1082000",
            "reactorName": "box1",
            "reactorState": 2,
            "x": 100,
            "y": 200,
            "type": "HIT",
            "body": { "characterId": 42, "skillId": 0, "isSkill": false }
        });
        let command: ReactorCommand = serde_json::from_value(json).unwrap();
        assert_eq!(command.character_id(), 42);
        assert_eq!(command.field(), Field::new(0, 1, 108000600));
        assert!(matches!(command.kind, ReactorCommandKind::Hit { .. }));
    }

    #[test]
    fn decodes_trigger_command() {
        let json = serde_json::json!({
            "worldId": 0,
            "channelId": 1,
            "mapId": 108000600,
            "reactorId": 55,
            "classification": "1082000",
            "reactorState": 4,
            "x": 0,
            "y": 0,
            "type": "TRIGGER",
            "body": { "characterId": 7 }
        });
        let command: ReactorCommand = serde_json::from_value(json).unwrap();
        assert_eq!(command.kind, ReactorCommandKind::Trigger { character_id: 7 });
        assert!(command.reactor_name.is_empty());
    }
}
