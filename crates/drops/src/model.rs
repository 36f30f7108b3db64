use chrono::{DateTime, Utc};
use common::{CharacterId, EquipmentStats, Field, TemplateId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::{DropError, Result};

/// Pet slot value meaning "no pet involved".
pub const NO_PET_SLOT: i8 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropStatus {
    #[default]
    Available,
    Reserved,
}

/// An item or meso pile lying on a map.
///
/// Exactly one of item (`item_id` with a positive quantity) or meso is set.
/// Records are immutable; state transitions return a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drop {
    id: u32,
    transaction_id: TransactionId,
    field: Field,
    item_id: TemplateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equipment: Option<EquipmentStats>,
    quantity: u32,
    meso: u32,
    drop_type: u8,
    x: i16,
    y: i16,
    owner_id: CharacterId,
    owner_party_id: u32,
    drop_time: DateTime<Utc>,
    dropper_id: u32,
    dropper_x: i16,
    dropper_y: i16,
    player_drop: bool,
    status: DropStatus,
    #[serde(default)]
    reserved_by: Option<CharacterId>,
    pet_slot: i8,
}

impl Drop {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Transaction that created the drop; lifecycle events are correlated on it.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn item_id(&self) -> TemplateId {
        self.item_id
    }

    pub fn equipment(&self) -> Option<&EquipmentStats> {
        self.equipment.as_ref()
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn meso(&self) -> u32 {
        self.meso
    }

    pub fn is_meso(&self) -> bool {
        self.meso > 0
    }

    pub fn drop_type(&self) -> u8 {
        self.drop_type
    }

    pub fn position(&self) -> (i16, i16) {
        (self.x, self.y)
    }

    pub fn owner_id(&self) -> CharacterId {
        self.owner_id
    }

    pub fn owner_party_id(&self) -> u32 {
        self.owner_party_id
    }

    pub fn drop_time(&self) -> DateTime<Utc> {
        self.drop_time
    }

    pub fn dropper_id(&self) -> u32 {
        self.dropper_id
    }

    pub fn dropper_position(&self) -> (i16, i16) {
        (self.dropper_x, self.dropper_y)
    }

    pub fn player_drop(&self) -> bool {
        self.player_drop
    }

    pub fn status(&self) -> DropStatus {
        self.status
    }

    pub fn reserved_by(&self) -> Option<CharacterId> {
        self.reserved_by
    }

    pub fn pet_slot(&self) -> i8 {
        self.pet_slot
    }

    pub fn is_reserved_by(&self, character_id: CharacterId) -> bool {
        self.status == DropStatus::Reserved && self.reserved_by == Some(character_id)
    }

    /// Copy of this drop held by `character_id`.
    pub fn reserve(&self, character_id: CharacterId, pet_slot: i8) -> Drop {
        Drop {
            status: DropStatus::Reserved,
            reserved_by: Some(character_id),
            pet_slot,
            ..self.clone()
        }
    }

    /// Copy of this drop with any reservation released.
    pub fn cancel_reservation(&self) -> Drop {
        Drop {
            status: DropStatus::Available,
            reserved_by: None,
            pet_slot: NO_PET_SLOT,
            ..self.clone()
        }
    }
}

/// Builder for new drops. The registry assigns the id.
#[derive(Debug, Clone, Default)]
pub struct DropBuilder {
    transaction_id: Option<TransactionId>,
    field: Option<Field>,
    item_id: TemplateId,
    equipment: Option<EquipmentStats>,
    quantity: u32,
    meso: u32,
    drop_type: u8,
    x: i16,
    y: i16,
    owner_id: CharacterId,
    owner_party_id: u32,
    drop_time: Option<DateTime<Utc>>,
    dropper_id: u32,
    dropper_x: i16,
    dropper_y: i16,
    player_drop: bool,
}

impl DropBuilder {
    pub fn new(transaction_id: TransactionId, field: Field) -> Self {
        Self {
            transaction_id: Some(transaction_id),
            field: Some(field),
            ..Self::default()
        }
    }

    pub fn item(mut self, item_id: TemplateId, quantity: u32) -> Self {
        self.item_id = item_id;
        self.quantity = quantity;
        self
    }

    pub fn equipment(mut self, stats: EquipmentStats) -> Self {
        self.equipment = Some(stats);
        self
    }

    pub fn meso(mut self, meso: u32) -> Self {
        self.meso = meso;
        self
    }

    pub fn drop_type(mut self, drop_type: u8) -> Self {
        self.drop_type = drop_type;
        self
    }

    pub fn position(mut self, x: i16, y: i16) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn owner(mut self, owner_id: CharacterId, owner_party_id: u32) -> Self {
        self.owner_id = owner_id;
        self.owner_party_id = owner_party_id;
        self
    }

    pub fn dropper(mut self, dropper_id: u32, x: i16, y: i16) -> Self {
        self.dropper_id = dropper_id;
        self.dropper_x = x;
        self.dropper_y = y;
        self
    }

    pub fn player_drop(mut self, player_drop: bool) -> Self {
        self.player_drop = player_drop;
        self
    }

    pub fn drop_time(mut self, drop_time: DateTime<Utc>) -> Self {
        self.drop_time = Some(drop_time);
        self
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Checks the builder without consuming it, so registries can reject a
    /// drop before allocating an id for it.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.is_none() {
            return Err(DropError::Invalid("transaction id is required".to_string()));
        }
        if self.field.is_none() {
            return Err(DropError::Invalid("field is required".to_string()));
        }
        let is_item = self.item_id != 0;
        let is_meso = self.meso > 0;
        match (is_item, is_meso) {
            (true, true) => Err(DropError::Invalid(
                "drop cannot carry both an item and meso".to_string(),
            )),
            (false, false) => Err(DropError::Invalid(
                "drop must carry an item or meso".to_string(),
            )),
            (true, false) if self.quantity == 0 => Err(DropError::Invalid(
                "item drop quantity must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn build(self, id: u32) -> Result<Drop> {
        self.validate()?;
        let (Some(transaction_id), Some(field)) = (self.transaction_id, self.field) else {
            return Err(DropError::Invalid("incomplete drop".to_string()));
        };
        Ok(Drop {
            id,
            transaction_id,
            field,
            item_id: self.item_id,
            equipment: self.equipment,
            quantity: self.quantity,
            meso: self.meso,
            drop_type: self.drop_type,
            x: self.x,
            y: self.y,
            owner_id: self.owner_id,
            owner_party_id: self.owner_party_id,
            drop_time: self.drop_time.unwrap_or_else(Utc::now),
            dropper_id: self.dropper_id,
            dropper_x: self.dropper_x,
            dropper_y: self.dropper_y,
            player_drop: self.player_drop,
            status: DropStatus::Available,
            reserved_by: None,
            pet_slot: NO_PET_SLOT,
        })
    }
}
