use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{CharacterId, EquipmentStats, InventoryType, TEMPORARY_SLOT, TemplateId};
use serde::{Deserialize, Serialize};

/// Which container a compartment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "inventoryType", rename_all = "camelCase")]
pub enum CompartmentKind {
    /// One tab of a character's inventory. Equipped assets live in the
    /// equip tab at negative slots.
    CharacterInventory(InventoryType),
    /// Account-wide storage.
    AccountStorage,
    /// Cash shop inventory.
    CashShop,
}

impl CompartmentKind {
    /// Capacity used when no explicit capacity has been recorded.
    pub fn default_capacity(&self) -> u16 {
        match self {
            CompartmentKind::CharacterInventory(_) => 24,
            CompartmentKind::AccountStorage => 4,
            CompartmentKind::CashShop => 50,
        }
    }

    pub fn inventory_type(&self) -> Option<InventoryType> {
        match self {
            CompartmentKind::CharacterInventory(inventory_type) => Some(*inventory_type),
            _ => None,
        }
    }

    /// Stored name, e.g. `characterInventory-equip`.
    pub fn as_name(&self) -> String {
        match self {
            CompartmentKind::CharacterInventory(t) => format!("characterInventory-{t}"),
            CompartmentKind::AccountStorage => "accountStorage".to_string(),
            CompartmentKind::CashShop => "cashShop".to_string(),
        }
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "accountStorage" => Some(CompartmentKind::AccountStorage),
            "cashShop" => Some(CompartmentKind::CashShop),
            other => {
                let tab = other.strip_prefix("characterInventory-")?;
                InventoryType::ALL
                    .into_iter()
                    .find(|t| t.as_str() == tab)
                    .map(CompartmentKind::CharacterInventory)
            }
        }
    }
}

impl std::fmt::Display for CompartmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_name())
    }
}

/// Addresses a compartment. `owner_id` is the character for inventory tabs
/// and the account for storage and cash shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentKey {
    pub owner_id: u32,
    #[serde(flatten)]
    pub kind: CompartmentKind,
}

impl CompartmentKey {
    pub fn character(character_id: CharacterId, inventory_type: InventoryType) -> Self {
        Self {
            owner_id: character_id,
            kind: CompartmentKind::CharacterInventory(inventory_type),
        }
    }

    pub fn storage(account_id: u32) -> Self {
        Self {
            owner_id: account_id,
            kind: CompartmentKind::AccountStorage,
        }
    }

    pub fn cash_shop(account_id: u32) -> Self {
        Self {
            owner_id: account_id,
            kind: CompartmentKind::CashShop,
        }
    }
}

impl std::fmt::Display for CompartmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.owner_id, self.kind)
    }
}

/// A slot-placed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: u32,
    pub slot: i16,
    pub template_id: TemplateId,
    pub quantity: u32,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
    /// Shared reference data (template and equipment stats).
    pub reference_id: u32,
}

impl Asset {
    pub fn is_equipped(&self) -> bool {
        self.slot < 0 && self.slot != TEMPORARY_SLOT
    }
}

/// Data shared by every asset pointing at it. The reference survives while
/// at least one compartment holds an asset for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    pub id: u32,
    pub template_id: TemplateId,
    #[serde(default)]
    pub stats: Option<EquipmentStats>,
    pub reference_count: u32,
}

/// Snapshot of one compartment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compartment {
    pub key: CompartmentKey,
    pub capacity: u16,
    assets: BTreeMap<i16, Asset>,
}

impl Compartment {
    pub fn new(key: CompartmentKey, capacity: u16) -> Self {
        Self {
            key,
            capacity,
            assets: BTreeMap::new(),
        }
    }

    pub fn with_assets(key: CompartmentKey, capacity: u16, assets: Vec<Asset>) -> Self {
        let mut compartment = Self::new(key, capacity);
        for asset in assets {
            compartment.assets.insert(asset.slot, asset);
        }
        compartment
    }

    pub fn asset_at(&self, slot: i16) -> Option<&Asset> {
        self.assets.get(&slot)
    }

    pub fn asset_by_id(&self, asset_id: u32) -> Option<&Asset> {
        self.assets.values().find(|a| a.id == asset_id)
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Assets of `template_id` in slot order.
    pub fn assets_of(&self, template_id: TemplateId) -> Vec<&Asset> {
        self.assets
            .values()
            .filter(|a| a.template_id == template_id && a.slot > 0)
            .collect()
    }

    /// Lowest free slot in `1..=capacity`.
    pub fn next_free_slot(&self) -> Option<i16> {
        (1..=self.capacity as i16).find(|slot| !self.assets.contains_key(slot))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub(crate) fn put(&mut self, asset: Asset) {
        self.assets.insert(asset.slot, asset);
    }

    pub(crate) fn take(&mut self, slot: i16) -> Option<Asset> {
        self.assets.remove(&slot)
    }

    pub(crate) fn asset_at_mut(&mut self, slot: i16) -> Option<&mut Asset> {
        self.assets.get_mut(&slot)
    }

    /// Slot-to-template view, handy for comparing layouts.
    pub fn layout(&self) -> BTreeMap<i16, TemplateId> {
        self.assets
            .iter()
            .map(|(slot, asset)| (*slot, asset.template_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: u32, slot: i16, template_id: TemplateId) -> Asset {
        Asset {
            id,
            slot,
            template_id,
            quantity: 1,
            expiration: None,
            reference_id: id,
        }
    }

    #[test]
    fn next_free_slot_skips_occupied_and_equipped() {
        let key = CompartmentKey::character(1, InventoryType::Equip);
        let compartment = Compartment::with_assets(
            key,
            3,
            vec![asset(1, 1, 1302000), asset(2, -11, 1302001), asset(3, 2, 1040000)],
        );
        assert_eq!(compartment.next_free_slot(), Some(3));
    }

    #[test]
    fn full_compartment_has_no_free_slot() {
        let key = CompartmentKey::storage(9);
        let compartment = Compartment::with_assets(key, 1, vec![asset(1, 1, 2000000)]);
        assert_eq!(compartment.next_free_slot(), None);
    }

    #[test]
    fn kind_names_round_trip() {
        let kinds = [
            CompartmentKind::CharacterInventory(InventoryType::Use),
            CompartmentKind::AccountStorage,
            CompartmentKind::CashShop,
        ];
        for kind in kinds {
            assert_eq!(CompartmentKind::parse_name(&kind.as_name()), Some(kind));
        }
        assert_eq!(CompartmentKind::parse_name("characterInventory-bogus"), None);
    }

    #[test]
    fn key_wire_shape() {
        let key = CompartmentKey::character(42, InventoryType::Equip);
        let json = serde_json::to_value(key).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ownerId": 42, "kind": "characterInventory", "inventoryType": "equip"})
        );
        let storage = serde_json::to_value(CompartmentKey::storage(7)).unwrap();
        assert_eq!(storage, serde_json::json!({"ownerId": 7, "kind": "accountStorage"}));
    }

    #[test]
    fn equipped_excludes_temporary_slot() {
        assert!(asset(1, -5, 1040000).is_equipped());
        assert!(!asset(1, TEMPORARY_SLOT, 1040000).is_equipped());
        assert!(!asset(1, 3, 1040000).is_equipped());
    }
}
