//! Step actions.
//!
//! Every step carries exactly one [`Action`]; the payload type is fixed by
//! the action kind. On the wire the pair travels as
//! `{"action": "award_mesos", "body": {...}}`.

use chrono::{DateTime, Utc};
use common::{CharacterId, Field, InventoryType, TemplateId};
use drops::SpawnDropBody;
use serde::{Deserialize, Serialize};

/// An item to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub template_id: TemplateId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

/// `award_inventory` / `award_asset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardItemPayload {
    pub character_id: CharacterId,
    pub item: ItemPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceDistribution {
    pub experience_type: String,
    pub amount: u32,
    #[serde(default)]
    pub attr1: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardExperiencePayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub distributions: Vec<ExperienceDistribution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardLevelPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub amount: u8,
}

/// Mesos change; negative amounts deduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardMesosPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    #[serde(default)]
    pub actor_id: u32,
    #[serde(default = "system_actor")]
    pub actor_type: String,
    pub amount: i32,
}

fn system_actor() -> String {
    "SYSTEM".to_string()
}

/// Cash shop wallet change. `currency_type`: 1 credit, 2 points, 3 prepaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardCurrencyPayload {
    pub character_id: CharacterId,
    pub account_id: u32,
    pub currency_type: u32,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardFamePayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub amount: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyAssetPayload {
    pub character_id: CharacterId,
    pub template_id: TemplateId,
    pub quantity: u32,
    /// Remove every instance regardless of `quantity`.
    #[serde(default)]
    pub remove_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyAssetFromSlotPayload {
    pub character_id: CharacterId,
    pub inventory_type: InventoryType,
    pub slot: i16,
    pub quantity: u32,
}

/// `equip_asset` / `unequip_asset`. A missing destination is resolved by
/// the compartment engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipAssetPayload {
    pub character_id: CharacterId,
    pub source: i16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAndEquipAssetPayload {
    pub character_id: CharacterId,
    pub item: ItemPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnDropPayload {
    pub field: Field,
    pub drop: SpawnDropBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveDropPayload {
    pub field: Field,
    pub drop_id: u32,
    pub character_id: CharacterId,
    #[serde(default = "no_pet")]
    pub pet_slot: i8,
}

fn no_pet() -> i8 {
    -1
}

/// `cancel_drop_reservation` / `gather_drop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPayload {
    pub field: Field,
    pub drop_id: u32,
    pub character_id: CharacterId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReactorDropType {
    /// Everything lands at once.
    #[default]
    Drop,
    /// Drops fan out one after another.
    Spray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorDropEntry {
    #[serde(default)]
    pub item_id: TemplateId,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub meso: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnReactorDropsPayload {
    pub character_id: CharacterId,
    pub field: Field,
    pub reactor_id: u32,
    pub x: i16,
    pub y: i16,
    #[serde(default)]
    pub drop_type: ReactorDropType,
    pub drops: Vec<ReactorDropEntry>,
}

/// `change_job`. `previous` enables rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeJobPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub job_id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<u16>,
}

/// `change_hair` / `change_face` / `change_skin`. `previous` enables rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStylePayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub style_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<u32>,
}

/// `create_skill` / `update_skill`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub skill_id: u32,
    pub level: u8,
    pub master_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCondition {
    /// e.g. `meso`, `level`, `job`, `item`.
    #[serde(rename = "type")]
    pub condition_type: String,
    pub operator: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCharacterStatePayload {
    pub character_id: CharacterId,
    pub conditions: Vec<ValidationCondition>,
}

/// Character attributes beyond these are chosen by the character service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterPayload {
    pub account_id: u32,
    pub world_id: u8,
    pub name: String,
    pub gender: u8,
    pub job_id: u16,
    pub face: u32,
    pub hair: u32,
    pub skin: u32,
    #[serde(default = "first_level")]
    pub level: u8,
    pub strength: u16,
    pub dexterity: u16,
    pub intelligence: u16,
    pub luck: u16,
    pub hp: u16,
    pub mp: u16,
}

fn first_level() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncreaseBuddyCapacityPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub amount: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainClosenessPayload {
    pub pet_id: u32,
    pub amount: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetHpPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub amount: u16,
}

/// Experience never drops below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductExperiencePayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub amount: u32,
}

/// Actions that only need the character and where it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterFieldPayload {
    pub character_id: CharacterId,
    pub field: Field,
}

/// Actions that only need the character and its channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterChannelPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarpToPortalPayload {
    pub character_id: CharacterId,
    pub field: Field,
    pub portal_id: u32,
    /// Resolved to an id by the portal service when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitePayload {
    /// `GUILD`, `PARTY` or `BUDDY`.
    pub invite_type: String,
    pub originator_id: CharacterId,
    pub target_id: CharacterId,
    pub reference_id: u32,
    pub world_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnMonsterPayload {
    pub character_id: CharacterId,
    pub field: Field,
    pub monster_id: u32,
    pub x: i16,
    pub y: i16,
    #[serde(default)]
    pub team: i8,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

/// Hits a reactor in the field, addressed by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitReactorPayload {
    pub character_id: CharacterId,
    pub field: Field,
    pub reactor_name: String,
    #[serde(default)]
    pub skill_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuestPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub quest_id: u32,
    #[serde(default)]
    pub npc_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteQuestPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub quest_id: u32,
    #[serde(default)]
    pub npc_id: u32,
    /// Start the chained quest once this one completes.
    #[serde(default)]
    pub start_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuestProgressPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub quest_id: u32,
    pub info_number: u32,
    pub progress: String,
}

/// Applies an item's effect without taking it from the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyConsumableEffectPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub item_id: TemplateId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    /// `NOTICE`, `POP_UP`, `PINK_TEXT` or `BLUE_TEXT`.
    pub message_type: String,
    pub message: String,
}

/// `show_info` / `show_intro`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowEffectPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowInfoTextPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAreaInfoPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub area: u16,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowHintPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub hint: String,
    /// Zero lets the client size the box.
    #[serde(default)]
    pub width: u16,
    #[serde(default)]
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowGuideHintPayload {
    pub character_id: CharacterId,
    pub world_id: u8,
    pub channel_id: u8,
    pub hint_id: u32,
    /// Milliseconds; the client default applies when zero.
    #[serde(default)]
    pub duration: u32,
}

/// `block_portal` / `unblock_portal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalPayload {
    pub character_id: CharacterId,
    pub map_id: u32,
    pub portal_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositToStoragePayload {
    pub character_id: CharacterId,
    pub account_id: u32,
    pub world_id: u8,
    pub slot: i16,
    pub template_id: TemplateId,
    pub reference_id: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageMesosOperation {
    Set,
    Add,
    Subtract,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStorageMesosPayload {
    pub character_id: CharacterId,
    pub account_id: u32,
    pub world_id: u8,
    pub operation: StorageMesosOperation,
    pub mesos: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowStoragePayload {
    pub character_id: CharacterId,
    pub npc_id: u32,
    pub world_id: u8,
    pub channel_id: u8,
    pub account_id: u32,
}

/// Accepts a shared reference into a character inventory tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptToCharacterPayload {
    pub character_id: CharacterId,
    pub inventory_type: InventoryType,
    pub reference_id: u32,
    pub quantity: u32,
}

/// Accepts a shared reference into account storage or the cash shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptToAccountPayload {
    pub character_id: CharacterId,
    pub account_id: u32,
    pub reference_id: u32,
    pub quantity: u32,
}

/// Releases an asset from a character inventory tab. `quantity` is the
/// asset's quantity, restored if the release is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFromCharacterPayload {
    pub character_id: CharacterId,
    pub inventory_type: InventoryType,
    pub asset_id: u32,
    pub quantity: u32,
}

/// Releases an asset from account storage or the cash shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFromAccountPayload {
    pub character_id: CharacterId,
    pub account_id: u32,
    pub asset_id: u32,
    pub quantity: u32,
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "body", rename_all = "snake_case")]
pub enum Action {
    /// Superseded by `award_asset`; kept for sagas already in flight.
    AwardInventory(AwardItemPayload),
    AwardAsset(AwardItemPayload),
    AwardExperience(AwardExperiencePayload),
    AwardLevel(AwardLevelPayload),
    AwardMesos(AwardMesosPayload),
    AwardCurrency(AwardCurrencyPayload),
    AwardFame(AwardFamePayload),
    DestroyAsset(DestroyAssetPayload),
    DestroyAssetFromSlot(DestroyAssetFromSlotPayload),
    EquipAsset(EquipAssetPayload),
    UnequipAsset(EquipAssetPayload),
    CreateAndEquipAsset(CreateAndEquipAssetPayload),
    SpawnDrop(SpawnDropPayload),
    ReserveDrop(ReserveDropPayload),
    CancelDropReservation(DropPayload),
    GatherDrop(DropPayload),
    SpawnReactorDrops(SpawnReactorDropsPayload),
    ChangeJob(ChangeJobPayload),
    ChangeHair(ChangeStylePayload),
    ChangeFace(ChangeStylePayload),
    ChangeSkin(ChangeStylePayload),
    CreateSkill(SkillPayload),
    UpdateSkill(SkillPayload),
    ValidateCharacterState(ValidateCharacterStatePayload),
    CreateCharacter(CreateCharacterPayload),
    IncreaseBuddyCapacity(IncreaseBuddyCapacityPayload),
    GainCloseness(GainClosenessPayload),
    SetHp(SetHpPayload),
    DeductExperience(DeductExperiencePayload),
    CancelAllBuffs(CharacterFieldPayload),
    ResetStats(CharacterChannelPayload),
    WarpToRandomPortal(CharacterFieldPayload),
    WarpToPortal(WarpToPortalPayload),
    RequestGuildName(CharacterChannelPayload),
    RequestGuildEmblem(CharacterChannelPayload),
    RequestGuildDisband(CharacterChannelPayload),
    RequestGuildCapacityIncrease(CharacterChannelPayload),
    CreateInvite(CreateInvitePayload),
    SpawnMonster(SpawnMonsterPayload),
    HitReactor(HitReactorPayload),
    StartQuest(StartQuestPayload),
    CompleteQuest(CompleteQuestPayload),
    SetQuestProgress(SetQuestProgressPayload),
    ApplyConsumableEffect(ApplyConsumableEffectPayload),
    SendMessage(SendMessagePayload),
    DepositToStorage(DepositToStoragePayload),
    UpdateStorageMesos(UpdateStorageMesosPayload),
    ShowStorage(ShowStoragePayload),
    AcceptToStorage(AcceptToAccountPayload),
    ReleaseFromStorage(ReleaseFromAccountPayload),
    AcceptToCharacter(AcceptToCharacterPayload),
    ReleaseFromCharacter(ReleaseFromCharacterPayload),
    AcceptToCashShop(AcceptToAccountPayload),
    ReleaseFromCashShop(ReleaseFromAccountPayload),
    PlayPortalSound(CharacterChannelPayload),
    ShowInfo(ShowEffectPayload),
    ShowInfoText(ShowInfoTextPayload),
    UpdateAreaInfo(UpdateAreaInfoPayload),
    ShowHint(ShowHintPayload),
    ShowGuideHint(ShowGuideHintPayload),
    ShowIntro(ShowEffectPayload),
    BlockPortal(PortalPayload),
    UnblockPortal(PortalPayload),
}

impl Action {
    /// Wire name of the action, e.g. `award_mesos`.
    pub fn name(&self) -> &'static str {
        use Action::*;
        match self {
            AwardInventory(_) => "award_inventory",
            AwardAsset(_) => "award_asset",
            AwardExperience(_) => "award_experience",
            AwardLevel(_) => "award_level",
            AwardMesos(_) => "award_mesos",
            AwardCurrency(_) => "award_currency",
            AwardFame(_) => "award_fame",
            DestroyAsset(_) => "destroy_asset",
            DestroyAssetFromSlot(_) => "destroy_asset_from_slot",
            EquipAsset(_) => "equip_asset",
            UnequipAsset(_) => "unequip_asset",
            CreateAndEquipAsset(_) => "create_and_equip_asset",
            SpawnDrop(_) => "spawn_drop",
            ReserveDrop(_) => "reserve_drop",
            CancelDropReservation(_) => "cancel_drop_reservation",
            GatherDrop(_) => "gather_drop",
            SpawnReactorDrops(_) => "spawn_reactor_drops",
            ChangeJob(_) => "change_job",
            ChangeHair(_) => "change_hair",
            ChangeFace(_) => "change_face",
            ChangeSkin(_) => "change_skin",
            CreateSkill(_) => "create_skill",
            UpdateSkill(_) => "update_skill",
            ValidateCharacterState(_) => "validate_character_state",
            CreateCharacter(_) => "create_character",
            IncreaseBuddyCapacity(_) => "increase_buddy_capacity",
            GainCloseness(_) => "gain_closeness",
            SetHp(_) => "set_hp",
            DeductExperience(_) => "deduct_experience",
            CancelAllBuffs(_) => "cancel_all_buffs",
            ResetStats(_) => "reset_stats",
            WarpToRandomPortal(_) => "warp_to_random_portal",
            WarpToPortal(_) => "warp_to_portal",
            RequestGuildName(_) => "request_guild_name",
            RequestGuildEmblem(_) => "request_guild_emblem",
            RequestGuildDisband(_) => "request_guild_disband",
            RequestGuildCapacityIncrease(_) => "request_guild_capacity_increase",
            CreateInvite(_) => "create_invite",
            SpawnMonster(_) => "spawn_monster",
            HitReactor(_) => "hit_reactor",
            StartQuest(_) => "start_quest",
            CompleteQuest(_) => "complete_quest",
            SetQuestProgress(_) => "set_quest_progress",
            ApplyConsumableEffect(_) => "apply_consumable_effect",
            SendMessage(_) => "send_message",
            DepositToStorage(_) => "deposit_to_storage",
            UpdateStorageMesos(_) => "update_storage_mesos",
            ShowStorage(_) => "show_storage",
            AcceptToStorage(_) => "accept_to_storage",
            ReleaseFromStorage(_) => "release_from_storage",
            AcceptToCharacter(_) => "accept_to_character",
            ReleaseFromCharacter(_) => "release_from_character",
            AcceptToCashShop(_) => "accept_to_cash_shop",
            ReleaseFromCashShop(_) => "release_from_cash_shop",
            PlayPortalSound(_) => "play_portal_sound",
            ShowInfo(_) => "show_info",
            ShowInfoText(_) => "show_info_text",
            UpdateAreaInfo(_) => "update_area_info",
            ShowHint(_) => "show_hint",
            ShowGuideHint(_) => "show_guide_hint",
            ShowIntro(_) => "show_intro",
            BlockPortal(_) => "block_portal",
            UnblockPortal(_) => "unblock_portal",
        }
    }

    /// Actions with no downstream status event; the dispatcher completes
    /// them as soon as their command is published.
    pub fn is_synchronous(&self) -> bool {
        use Action::*;
        matches!(
            self,
            PlayPortalSound(_)
                | ShowInfo(_)
                | ShowInfoText(_)
                | UpdateAreaInfo(_)
                | ShowHint(_)
                | ShowGuideHint(_)
                | ShowIntro(_)
                | BlockPortal(_)
                | UnblockPortal(_)
                | SendMessage(_)
                | SpawnMonster(_)
                | SpawnReactorDrops(_)
                | ShowStorage(_)
                | HitReactor(_)
                | CancelAllBuffs(_)
        )
    }

    /// Character the action concerns, when it names one.
    pub fn character_id(&self) -> Option<CharacterId> {
        use Action::*;
        let id = match self {
            AwardInventory(p) | AwardAsset(p) => p.character_id,
            AwardExperience(p) => p.character_id,
            AwardLevel(p) => p.character_id,
            AwardMesos(p) => p.character_id,
            AwardCurrency(p) => p.character_id,
            AwardFame(p) => p.character_id,
            DestroyAsset(p) => p.character_id,
            DestroyAssetFromSlot(p) => p.character_id,
            EquipAsset(p) | UnequipAsset(p) => p.character_id,
            CreateAndEquipAsset(p) => p.character_id,
            SpawnDrop(p) => p.drop.owner_id,
            ReserveDrop(p) => p.character_id,
            CancelDropReservation(p) | GatherDrop(p) => p.character_id,
            SpawnReactorDrops(p) => p.character_id,
            ChangeJob(p) => p.character_id,
            ChangeHair(p) | ChangeFace(p) | ChangeSkin(p) => p.character_id,
            CreateSkill(p) | UpdateSkill(p) => p.character_id,
            ValidateCharacterState(p) => p.character_id,
            CreateCharacter(_) | GainCloseness(_) => return None,
            IncreaseBuddyCapacity(p) => p.character_id,
            SetHp(p) => p.character_id,
            DeductExperience(p) => p.character_id,
            CancelAllBuffs(p) | WarpToRandomPortal(p) => p.character_id,
            ResetStats(p)
            | RequestGuildName(p)
            | RequestGuildEmblem(p)
            | RequestGuildDisband(p)
            | RequestGuildCapacityIncrease(p)
            | PlayPortalSound(p) => p.character_id,
            WarpToPortal(p) => p.character_id,
            CreateInvite(p) => p.originator_id,
            SpawnMonster(p) => p.character_id,
            HitReactor(p) => p.character_id,
            StartQuest(p) => p.character_id,
            CompleteQuest(p) => p.character_id,
            SetQuestProgress(p) => p.character_id,
            ApplyConsumableEffect(p) => p.character_id,
            SendMessage(p) => p.character_id,
            DepositToStorage(p) => p.character_id,
            UpdateStorageMesos(p) => p.character_id,
            ShowStorage(p) => p.character_id,
            AcceptToStorage(p) | AcceptToCashShop(p) => p.character_id,
            ReleaseFromStorage(p) | ReleaseFromCashShop(p) => p.character_id,
            AcceptToCharacter(p) => p.character_id,
            ReleaseFromCharacter(p) => p.character_id,
            ShowInfo(p) | ShowIntro(p) => p.character_id,
            ShowInfoText(p) => p.character_id,
            UpdateAreaInfo(p) => p.character_id,
            ShowHint(p) => p.character_id,
            ShowGuideHint(p) => p.character_id,
            BlockPortal(p) | UnblockPortal(p) => p.character_id,
        };
        Some(id)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesos(amount: i32) -> Action {
        Action::AwardMesos(AwardMesosPayload {
            character_id: 12345,
            world_id: 0,
            channel_id: 1,
            actor_id: 0,
            actor_type: "SYSTEM".to_string(),
            amount,
        })
    }

    #[test]
    fn wire_shape_is_action_and_body() {
        let json = serde_json::to_value(mesos(-500)).unwrap();
        assert_eq!(json["action"], "award_mesos");
        assert_eq!(json["body"]["characterId"], 12345);
        assert_eq!(json["body"]["amount"], -500);
    }

    #[test]
    fn name_matches_serialized_tag() {
        let actions = [
            mesos(1),
            Action::ShowInfo(ShowEffectPayload {
                character_id: 1,
                world_id: 0,
                channel_id: 1,
                path: "Effect/OnUserEff.img/RecoveryUp".to_string(),
            }),
            Action::ReleaseFromCashShop(ReleaseFromAccountPayload {
                character_id: 1,
                account_id: 2,
                asset_id: 3,
                quantity: 1,
            }),
        ];
        for action in actions {
            let json = serde_json::to_value(&action).unwrap();
            assert_eq!(json["action"], action.name());
        }
    }

    #[test]
    fn payload_type_follows_action() {
        // equip payload under a quest action must be rejected
        let json = serde_json::json!({
            "action": "start_quest",
            "body": {"characterId": 1, "source": 5}
        });
        assert!(serde_json::from_value::<Action>(json).is_err());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let json = serde_json::json!({"action": "summon_dragon", "body": {}});
        assert!(serde_json::from_value::<Action>(json).is_err());
    }

    #[test]
    fn decodes_defaults() {
        let json = serde_json::json!({
            "action": "reserve_drop",
            "body": {
                "field": {"worldId": 0, "channelId": 1, "mapId": 100000000},
                "dropId": 1000000001u32,
                "characterId": 12345
            }
        });
        let action: Action = serde_json::from_value(json).unwrap();
        let Action::ReserveDrop(payload) = action else {
            panic!("expected reserve_drop");
        };
        assert_eq!(payload.pet_slot, -1);
    }

    #[test]
    fn display_actions_are_synchronous() {
        assert!(
            Action::BlockPortal(PortalPayload {
                character_id: 1,
                map_id: 100000000,
                portal_id: 2
            })
            .is_synchronous()
        );
        assert!(!mesos(10).is_synchronous());
    }

    #[test]
    fn pet_actions_name_no_character() {
        let action = Action::GainCloseness(GainClosenessPayload { pet_id: 5, amount: 1 });
        assert_eq!(action.character_id(), None);
        assert_eq!(mesos(1).character_id(), Some(12345));
    }
}
