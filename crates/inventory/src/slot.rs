//! Equipment slot positions.

use common::TemplateId;

pub const CAP: i16 = -1;
pub const FACE_ACCESSORY: i16 = -2;
pub const EYE_ACCESSORY: i16 = -3;
pub const EARRING: i16 = -4;
pub const TOP: i16 = -5;
pub const PANTS: i16 = -6;
pub const SHOES: i16 = -7;
pub const GLOVES: i16 = -8;
pub const CAPE: i16 = -9;
pub const SHIELD: i16 = -10;
pub const WEAPON: i16 = -11;
pub const RING: i16 = -12;
pub const PENDANT: i16 = -17;

fn category(template_id: TemplateId) -> u32 {
    template_id / 10_000
}

/// One-piece outfits occupy the top slot and exclude pants.
pub fn is_overall(template_id: TemplateId) -> bool {
    category(template_id) == 105
}

/// Equip slot a template goes to, or `None` if it is not equipable.
pub fn equip_destination(template_id: TemplateId) -> Option<i16> {
    let slot = match category(template_id) {
        100 => CAP,
        101 => FACE_ACCESSORY,
        102 => EYE_ACCESSORY,
        103 => EARRING,
        104 | 105 => TOP,
        106 => PANTS,
        107 => SHOES,
        108 => GLOVES,
        109 => SHIELD,
        110 => CAPE,
        111 => RING,
        112 => PENDANT,
        130..=170 => WEAPON,
        _ => return None,
    };
    Some(slot)
}
