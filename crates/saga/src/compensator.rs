//! Reverse actions used to roll back completed steps.

use common::InventoryType;

use crate::action::{
    AcceptToAccountPayload, AcceptToCharacterPayload, AwardCurrencyPayload, AwardFamePayload,
    AwardMesosPayload, ChangeJobPayload, ChangeStylePayload, DestroyAssetFromSlotPayload,
    DestroyAssetPayload, DropPayload, EquipAssetPayload, ReleaseFromAccountPayload,
    ReleaseFromCharacterPayload,
};
use crate::saga::AUTO_EQUIP_PREFIX;
use crate::{Action, Saga};

/// How a completed step is undone.
#[derive(Debug, Clone, PartialEq)]
pub enum Reverse {
    /// Dispatch this action and wait for its outcome.
    Dispatch(Action),
    /// Nothing to undo.
    NoOp,
}

/// Reverse of the completed step at `index`.
pub fn reverse(saga: &Saga, index: usize) -> Reverse {
    let Some(step) = saga.step(index) else {
        return Reverse::NoOp;
    };
    let details = step.details.unwrap_or_default();

    let action = match &step.action {
        Action::EquipAsset(p) => {
            let Some(equipped) = details.slot.or(p.destination) else {
                return unknown_slot(step.action.name());
            };
            Action::UnequipAsset(EquipAssetPayload {
                character_id: p.character_id,
                source: equipped,
                destination: Some(p.source),
            })
        }
        Action::UnequipAsset(p) => {
            let Some(unequipped) = details.slot.or(p.destination) else {
                return unknown_slot(step.action.name());
            };
            Action::EquipAsset(EquipAssetPayload {
                character_id: p.character_id,
                source: unequipped,
                destination: Some(p.source),
            })
        }
        Action::CreateAndEquipAsset(p) => {
            let auto_equip = format!("{AUTO_EQUIP_PREFIX}{}", step.step_id);
            if saga.step_index(&auto_equip).is_none() {
                tracing::debug!(step_id = %step.step_id, "no auto-equip step, nothing to destroy");
                return Reverse::NoOp;
            }
            let template_id = p.item.template_id;
            match (details.slot, InventoryType::from_template_id(template_id)) {
                (Some(slot), Some(inventory_type)) => {
                    Action::DestroyAssetFromSlot(DestroyAssetFromSlotPayload {
                        character_id: p.character_id,
                        inventory_type,
                        slot,
                        quantity: p.item.quantity,
                    })
                }
                _ => Action::DestroyAsset(DestroyAssetPayload {
                    character_id: p.character_id,
                    template_id,
                    quantity: p.item.quantity,
                    remove_all: false,
                }),
            }
        }
        Action::AwardInventory(p) | Action::AwardAsset(p) => {
            Action::DestroyAsset(DestroyAssetPayload {
                character_id: p.character_id,
                template_id: p.item.template_id,
                quantity: p.item.quantity,
                remove_all: false,
            })
        }
        Action::AwardMesos(p) => Action::AwardMesos(AwardMesosPayload {
            amount: -p.amount,
            ..p.clone()
        }),
        Action::AwardCurrency(p) => Action::AwardCurrency(AwardCurrencyPayload {
            amount: -p.amount,
            ..p.clone()
        }),
        Action::AwardFame(p) => Action::AwardFame(AwardFamePayload {
            amount: -p.amount,
            ..p.clone()
        }),
        Action::AcceptToCharacter(p) => {
            let Some(asset_id) = details.asset_id else {
                return unknown_asset(step.action.name());
            };
            Action::ReleaseFromCharacter(ReleaseFromCharacterPayload {
                character_id: p.character_id,
                inventory_type: p.inventory_type,
                asset_id,
                quantity: p.quantity,
            })
        }
        Action::AcceptToStorage(p) | Action::AcceptToCashShop(p) => {
            let Some(asset_id) = details.asset_id else {
                return unknown_asset(step.action.name());
            };
            let payload = ReleaseFromAccountPayload {
                character_id: p.character_id,
                account_id: p.account_id,
                asset_id,
                quantity: p.quantity,
            };
            if matches!(step.action, Action::AcceptToStorage(_)) {
                Action::ReleaseFromStorage(payload)
            } else {
                Action::ReleaseFromCashShop(payload)
            }
        }
        Action::ReleaseFromCharacter(p) => {
            let Some(reference_id) = details.reference_id else {
                return unknown_asset(step.action.name());
            };
            Action::AcceptToCharacter(AcceptToCharacterPayload {
                character_id: p.character_id,
                inventory_type: p.inventory_type,
                reference_id,
                quantity: p.quantity,
            })
        }
        Action::ReleaseFromStorage(p) | Action::ReleaseFromCashShop(p) => {
            let Some(reference_id) = details.reference_id else {
                return unknown_asset(step.action.name());
            };
            let payload = AcceptToAccountPayload {
                character_id: p.character_id,
                account_id: p.account_id,
                reference_id,
                quantity: p.quantity,
            };
            if matches!(step.action, Action::ReleaseFromStorage(_)) {
                Action::AcceptToStorage(payload)
            } else {
                Action::AcceptToCashShop(payload)
            }
        }
        Action::ReserveDrop(p) => Action::CancelDropReservation(DropPayload {
            field: p.field,
            drop_id: p.drop_id,
            character_id: p.character_id,
        }),
        Action::ChangeJob(p) => match p.previous {
            Some(previous) => Action::ChangeJob(ChangeJobPayload {
                job_id: previous,
                previous: Some(p.job_id),
                ..p.clone()
            }),
            None => return not_captured(step.action.name()),
        },
        Action::ChangeHair(p) | Action::ChangeFace(p) | Action::ChangeSkin(p) => {
            let Some(previous) = p.previous else {
                return not_captured(step.action.name());
            };
            let payload = ChangeStylePayload {
                style_id: previous,
                previous: Some(p.style_id),
                ..p.clone()
            };
            match step.action {
                Action::ChangeHair(_) => Action::ChangeHair(payload),
                Action::ChangeFace(_) => Action::ChangeFace(payload),
                _ => Action::ChangeSkin(payload),
            }
        }
        other => {
            tracing::debug!(action = other.name(), "action has no reverse");
            return Reverse::NoOp;
        }
    };
    Reverse::Dispatch(action)
}

fn not_captured(action: &'static str) -> Reverse {
    tracing::info!(action, "prior state not captured, leaving change in place");
    Reverse::NoOp
}

fn unknown_slot(action: &'static str) -> Reverse {
    tracing::warn!(action, "completed step reported no slot, cannot reverse");
    Reverse::NoOp
}

fn unknown_asset(action: &'static str) -> Reverse {
    tracing::warn!(action, "completed step reported no asset, cannot reverse");
    Reverse::NoOp
}

/// True if `candidate` is what the engine dispatched to undo the step at
/// `index`. Used to correlate status events during compensation.
pub fn is_reverse_of(saga: &Saga, index: usize, candidate: &Action) -> bool {
    matches!(reverse(saga, index), Reverse::Dispatch(action) if action == *candidate)
}
