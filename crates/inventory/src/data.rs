use std::collections::HashMap;

use common::{EquipmentStats, InventoryType, TemplateId};

/// Stack size used when the data service has no entry for a template.
pub const DEFAULT_SLOT_MAX: u32 = 100;

/// Static item data served by the data service.
pub trait ItemDataProvider: Send + Sync {
    /// Maximum stack size for a template, if known.
    fn slot_max(&self, template_id: TemplateId) -> Option<u32>;

    /// Base statistics of an equipable template, if known.
    fn equipment_stats(&self, template_id: TemplateId) -> Option<EquipmentStats>;
}

/// Effective stack size: equipables never stack.
pub fn slot_max_for(
    data: &dyn ItemDataProvider,
    inventory_type: InventoryType,
    template_id: TemplateId,
) -> u32 {
    if !inventory_type.is_stackable() {
        return 1;
    }
    data.slot_max(template_id).unwrap_or(DEFAULT_SLOT_MAX).max(1)
}

/// Item data held in memory, seeded at start-up.
#[derive(Debug, Clone, Default)]
pub struct StaticItemData {
    slot_max: HashMap<TemplateId, u32>,
    equipment: HashMap<TemplateId, EquipmentStats>,
}

impl StaticItemData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot_max(mut self, template_id: TemplateId, slot_max: u32) -> Self {
        self.slot_max.insert(template_id, slot_max);
        self
    }

    pub fn with_equipment(mut self, template_id: TemplateId, stats: EquipmentStats) -> Self {
        self.equipment.insert(template_id, stats);
        self
    }
}

impl ItemDataProvider for StaticItemData {
    fn slot_max(&self, template_id: TemplateId) -> Option<u32> {
        self.slot_max.get(&template_id).copied()
    }

    fn equipment_stats(&self, template_id: TemplateId) -> Option<EquipmentStats> {
        self.equipment.get(&template_id).copied()
    }
}
