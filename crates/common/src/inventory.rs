use serde::{Deserialize, Serialize};

/// Reserved slot used while swapping two occupied slots.
///
/// No real asset may rest here; it only holds an asset between the three
/// moves of the temporary-slot protocol.
pub const TEMPORARY_SLOT: i16 = i16::MIN;

/// The character inventory tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryType {
    Equip,
    Use,
    Setup,
    Etc,
    Cash,
}

impl InventoryType {
    pub const ALL: [InventoryType; 5] = [
        InventoryType::Equip,
        InventoryType::Use,
        InventoryType::Setup,
        InventoryType::Etc,
        InventoryType::Cash,
    ];

    /// Derives the inventory type from an item template id (`1xxxxxx` equip,
    /// `2xxxxxx` use, `3xxxxxx` setup, `4xxxxxx` etc, `5xxxxxx` cash).
    pub fn from_template_id(template_id: u32) -> Option<Self> {
        match template_id / 1_000_000 {
            1 => Some(InventoryType::Equip),
            2 => Some(InventoryType::Use),
            3 => Some(InventoryType::Setup),
            4 => Some(InventoryType::Etc),
            5 => Some(InventoryType::Cash),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            InventoryType::Equip => 1,
            InventoryType::Use => 2,
            InventoryType::Setup => 3,
            InventoryType::Etc => 4,
            InventoryType::Cash => 5,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(InventoryType::Equip),
            2 => Some(InventoryType::Use),
            3 => Some(InventoryType::Setup),
            4 => Some(InventoryType::Etc),
            5 => Some(InventoryType::Cash),
            _ => None,
        }
    }

    /// Returns true for tabs whose assets stack by quantity.
    pub fn is_stackable(&self) -> bool {
        matches!(
            self,
            InventoryType::Use | InventoryType::Setup | InventoryType::Etc | InventoryType::Cash
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryType::Equip => "equip",
            InventoryType::Use => "use",
            InventoryType::Setup => "setup",
            InventoryType::Etc => "etc",
            InventoryType::Cash => "cash",
        }
    }
}

impl std::fmt::Display for InventoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stat bundle carried by equipable assets and equipment drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EquipmentStats {
    pub strength: u16,
    pub dexterity: u16,
    pub intelligence: u16,
    pub luck: u16,
    pub hp: u16,
    pub mp: u16,
    pub weapon_attack: u16,
    pub magic_attack: u16,
    pub weapon_defense: u16,
    pub magic_defense: u16,
    pub accuracy: u16,
    pub avoidability: u16,
    pub hands: u16,
    pub speed: u16,
    pub jump: u16,
    pub slots: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_type_from_template_id() {
        assert_eq!(InventoryType::from_template_id(1302000), Some(InventoryType::Equip));
        assert_eq!(InventoryType::from_template_id(2000000), Some(InventoryType::Use));
        assert_eq!(InventoryType::from_template_id(3010000), Some(InventoryType::Setup));
        assert_eq!(InventoryType::from_template_id(4000000), Some(InventoryType::Etc));
        assert_eq!(InventoryType::from_template_id(5000000), Some(InventoryType::Cash));
        assert_eq!(InventoryType::from_template_id(9000000), None);
        assert_eq!(InventoryType::from_template_id(1000000), Some(InventoryType::Equip));
    }

    #[test]
    fn inventory_type_u8_conversion() {
        for inventory_type in InventoryType::ALL {
            assert_eq!(InventoryType::from_u8(inventory_type.as_u8()), Some(inventory_type));
        }
        assert_eq!(InventoryType::from_u8(0), None);
    }

    #[test]
    fn only_equip_is_not_stackable() {
        assert!(!InventoryType::Equip.is_stackable());
        assert!(InventoryType::Use.is_stackable());
        assert!(InventoryType::Etc.is_stackable());
    }

    #[test]
    fn temporary_slot_is_outside_real_slot_range() {
        assert!(TEMPORARY_SLOT < -200);
    }

    #[test]
    fn equipment_stats_deserialize_missing_fields_as_zero() {
        let stats: EquipmentStats = serde_json::from_str(r#"{"strength": 3}"#).unwrap();
        assert_eq!(stats.strength, 3);
        assert_eq!(stats.weapon_attack, 0);
    }
}
