use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{CharacterId, InventoryType, TemplateId, TenantId, TransactionId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{InventoryError, Result};

/// A soft hold on part of a slot's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub transaction_id: TransactionId,
    pub template_id: TemplateId,
    pub quantity: u32,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

type SlotKey = (TenantId, CharacterId, InventoryType, i16);

/// Reservations keyed by slot, one writer per slot.
///
/// Expired entries are treated as absent immediately and purged by the
/// sweeper. Callers already hold the compartment lock, so cross-key updates
/// such as [`ReservationRegistry::swap_reservation`] do not race with each other.
#[derive(Clone, Default)]
pub struct ReservationRegistry {
    entries: Arc<DashMap<SlotKey, Reservation>>,
}

impl ReservationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a reservation. Fails if another live reservation covers the
    /// slot; re-adding for the same transaction returns the existing one.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
        template_id: TemplateId,
        quantity: u32,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let reservation = Reservation {
            transaction_id,
            template_id,
            quantity,
            expires_at: now + ttl,
        };
        match self
            .entries
            .entry((tenant_id, character_id, inventory_type, slot))
        {
            Entry::Occupied(mut existing) => {
                if existing.get().is_expired(now) {
                    existing.insert(reservation.clone());
                    Ok(reservation)
                } else if existing.get().transaction_id == transaction_id {
                    Ok(existing.get().clone())
                } else {
                    Err(InventoryError::SlotReserved { slot })
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(reservation.clone());
                Ok(reservation)
            }
        }
    }

    /// Live reservation on a slot, if any.
    pub fn get(
        &self,
        tenant_id: TenantId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
        now: DateTime<Utc>,
    ) -> Option<Reservation> {
        self.entries
            .get(&(tenant_id, character_id, inventory_type, slot))
            .filter(|r| !r.is_expired(now))
            .map(|r| r.value().clone())
    }

    /// Quantity currently held on a slot.
    pub fn get_reserved(
        &self,
        tenant_id: TenantId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
        now: DateTime<Utc>,
    ) -> u32 {
        self.get(tenant_id, character_id, inventory_type, slot, now)
            .map(|r| r.quantity)
            .unwrap_or(0)
    }

    /// Removes the reservation held by `transaction_id` on a slot.
    pub fn remove(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
    ) -> Option<Reservation> {
        self.entries
            .remove_if(&(tenant_id, character_id, inventory_type, slot), |_, r| {
                r.transaction_id == transaction_id
            })
            .map(|(_, r)| r)
    }

    /// Retargets reservations when two slots exchange contents.
    pub fn swap_reservation(
        &self,
        tenant_id: TenantId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        from_slot: i16,
        to_slot: i16,
    ) {
        let from_key = (tenant_id, character_id, inventory_type, from_slot);
        let to_key = (tenant_id, character_id, inventory_type, to_slot);
        let from = self.entries.remove(&from_key).map(|(_, r)| r);
        let to = self.entries.remove(&to_key).map(|(_, r)| r);
        if let Some(reservation) = from {
            self.entries.insert(to_key, reservation);
        }
        if let Some(reservation) = to {
            self.entries.insert(from_key, reservation);
        }
    }

    /// Drops every expired reservation. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, r| !r.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Sweeps expired reservations every `interval` until `shutdown` flips
    /// to true.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = registry.sweep_expired(Utc::now());
                        if removed > 0 {
                            tracing::debug!(removed, "expired inventory reservations");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!("reservation sweeper stopping");
                            return;
                        }
                    }
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARACTER: CharacterId = 12345;

    fn ttl() -> chrono::Duration {
        chrono::Duration::seconds(30)
    }

    #[test]
    fn second_reservation_on_slot_is_rejected() {
        let registry = ReservationRegistry::new();
        let tenant_id = TenantId::new();
        let now = Utc::now();

        registry
            .add(tenant_id, TransactionId::new(), CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
            .unwrap();
        let err = registry
            .add(tenant_id, TransactionId::new(), CHARACTER, InventoryType::Use, 1, 2000000, 1, ttl(), now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::SlotReserved { slot: 1 }));
    }

    #[test]
    fn same_transaction_re_add_is_idempotent() {
        let registry = ReservationRegistry::new();
        let tenant_id = TenantId::new();
        let tx = TransactionId::new();
        let now = Utc::now();

        let first = registry
            .add(tenant_id, tx, CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
            .unwrap();
        let again = registry
            .add(tenant_id, tx, CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn expired_reservations_are_absent() {
        let registry = ReservationRegistry::new();
        let tenant_id = TenantId::new();
        let now = Utc::now();

        registry
            .add(tenant_id, TransactionId::new(), CHARACTER, InventoryType::Etc, 3, 4000000, 2, ttl(), now)
            .unwrap();
        let later = now + chrono::Duration::seconds(31);
        assert_eq!(
            registry.get_reserved(tenant_id, CHARACTER, InventoryType::Etc, 3, later),
            0
        );
        registry
            .add(tenant_id, TransactionId::new(), CHARACTER, InventoryType::Etc, 3, 4000000, 1, ttl(), later)
            .unwrap();

        assert_eq!(registry.sweep_expired(later + chrono::Duration::seconds(31)), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_requires_owning_transaction() {
        let registry = ReservationRegistry::new();
        let tenant_id = TenantId::new();
        let tx = TransactionId::new();
        let now = Utc::now();
        registry
            .add(tenant_id, tx, CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
            .unwrap();

        assert!(
            registry
                .remove(tenant_id, TransactionId::new(), CHARACTER, InventoryType::Use, 1)
                .is_none()
        );
        let removed = registry
            .remove(tenant_id, tx, CHARACTER, InventoryType::Use, 1)
            .unwrap();
        assert_eq!(removed.quantity, 5);
    }

    #[test]
    fn swap_moves_reservations_with_their_assets() {
        let registry = ReservationRegistry::new();
        let tenant_id = TenantId::new();
        let tx = TransactionId::new();
        let now = Utc::now();
        registry
            .add(tenant_id, tx, CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
            .unwrap();

        registry.swap_reservation(tenant_id, CHARACTER, InventoryType::Use, 1, 4);

        assert_eq!(registry.get_reserved(tenant_id, CHARACTER, InventoryType::Use, 1, now), 0);
        assert_eq!(registry.get_reserved(tenant_id, CHARACTER, InventoryType::Use, 4, now), 5);
    }

    #[test]
    fn registries_are_tenant_scoped() {
        let registry = ReservationRegistry::new();
        let now = Utc::now();
        registry
            .add(TenantId::new(), TransactionId::new(), CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
            .unwrap();
        assert!(
            registry
                .add(TenantId::new(), TransactionId::new(), CHARACTER, InventoryType::Use, 1, 2000000, 5, ttl(), now)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown_signal() {
        let registry = ReservationRegistry::new();
        let (shutdown, rx) = watch::channel(false);
        let handle = registry.spawn_sweeper(Duration::from_millis(5), rx);

        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper ignored shutdown")
            .unwrap();
    }
}
