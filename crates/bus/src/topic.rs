//! Topic registry.
//!
//! Deployments rename topics through `TOPIC_<NAME>` environment variables;
//! the literal names below are used when no override is set.

/// Every topic the orchestrator produces to or consumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    CommandInventory,
    CommandDrop,
    CommandQuest,
    CommandCharacter,
    CommandReactor,
    CommandReactorActions,
    CommandSaga,
    CommandMonster,
    CommandGuild,
    CommandPortal,
    CommandMessage,
    CommandStorage,
    CommandCashShop,
    CommandSystemMessage,
    EventInventoryChanged,
    EventCompartmentStatus,
    EventDropStatus,
    EventSagaStatus,
    EventQuestStatus,
    EventCharacterStatus,
}

impl Topic {
    /// Name used when no environment override is present.
    pub fn default_name(&self) -> &'static str {
        match self {
            Topic::CommandInventory => "command.inventory",
            Topic::CommandDrop => "command.drop",
            Topic::CommandQuest => "command.quest",
            Topic::CommandCharacter => "command.character",
            Topic::CommandReactor => "command.reactor",
            Topic::CommandReactorActions => "command.reactor-actions",
            Topic::CommandSaga => "command.saga",
            Topic::CommandMonster => "command.monster",
            Topic::CommandGuild => "command.guild",
            Topic::CommandPortal => "command.portal",
            Topic::CommandMessage => "command.message",
            Topic::CommandStorage => "command.storage",
            Topic::CommandCashShop => "command.cash-shop",
            Topic::CommandSystemMessage => "command.system-message",
            Topic::EventInventoryChanged => "event.inventory-changed",
            Topic::EventCompartmentStatus => "event.compartment-status",
            Topic::EventDropStatus => "event.drop-status",
            Topic::EventSagaStatus => "event.saga-status",
            Topic::EventQuestStatus => "event.quest-status",
            Topic::EventCharacterStatus => "event.character-status",
        }
    }

    /// Environment variable consulted for an override, e.g. `TOPIC_EVENT_DROP_STATUS`.
    pub fn env_key(&self) -> String {
        let normalized: String = self
            .default_name()
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("TOPIC_{normalized}")
    }

    /// Resolved topic name.
    pub fn name(&self) -> String {
        std::env::var(self.env_key()).unwrap_or_else(|_| self.default_name().to_string())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
