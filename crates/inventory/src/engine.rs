use std::sync::Arc;

use bus::{Buffer, Publisher, Topic};
use chrono::{DateTime, Utc};
use common::{
    CharacterId, EquipmentStats, InventoryType, TEMPORARY_SLOT, TemplateId, Tenant,
    TransactionId,
};

use crate::data::{ItemDataProvider, slot_max_for};
use crate::{
    Asset, AssetReference, Change, Compartment, CompartmentKey, InventoryChangeKind,
    InventoryChangedEvent, InventoryError, InventoryRepository, LockRegistry, Reservation,
    ReservationRegistry, Result, slot,
};

/// Collects the writes and events of one mutation.
///
/// Nothing reaches the repository or the bus until [`InventoryEngine::finish`]
/// commits; an error anywhere before that discards the whole unit.
struct Work {
    transaction_id: TransactionId,
    changes: Vec<Change>,
    events: Vec<InventoryChangedEvent>,
    swaps: Vec<(CompartmentKey, i16, i16)>,
}

impl Work {
    fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            changes: Vec::new(),
            events: Vec::new(),
            swaps: Vec::new(),
        }
    }

    fn event(&mut self, key: CompartmentKey, slot: i16, kind: InventoryChangeKind) {
        self.events
            .push(InventoryChangedEvent::new(self.transaction_id, key, slot, kind));
    }

    fn put(&mut self, compartment: &mut Compartment, asset: Asset) {
        self.changes.push(Change::PutAsset {
            key: compartment.key,
            asset: asset.clone(),
        });
        compartment.put(asset);
    }

    fn added(&mut self, compartment: &mut Compartment, asset: Asset) {
        self.event(
            compartment.key,
            asset.slot,
            InventoryChangeKind::Added {
                asset_id: asset.id,
                template_id: asset.template_id,
                quantity: asset.quantity,
                reference_id: asset.reference_id,
                expiration: asset.expiration,
            },
        );
        self.put(compartment, asset);
    }

    fn quantity_updated(&mut self, compartment: &mut Compartment, asset: Asset) {
        self.event(
            compartment.key,
            asset.slot,
            InventoryChangeKind::QuantityUpdated {
                asset_id: asset.id,
                quantity: asset.quantity,
            },
        );
        self.put(compartment, asset);
    }

    fn moved(&mut self, compartment: &mut Compartment, mut asset: Asset, to: i16) {
        let from = asset.slot;
        asset.slot = to;
        self.event(
            compartment.key,
            to,
            InventoryChangeKind::Moved {
                asset_id: asset.id,
                old_slot: from,
            },
        );
        self.put(compartment, asset);
    }

    fn removed(&mut self, compartment: &mut Compartment, slot: i16) -> Option<Asset> {
        let asset = compartment.take(slot)?;
        self.changes.push(Change::DeleteAsset {
            key: compartment.key,
            asset_id: asset.id,
        });
        self.event(
            compartment.key,
            slot,
            InventoryChangeKind::Removed { asset_id: asset.id },
        );
        Some(asset)
    }
}

/// Serves every asset-mutating command.
///
/// Each mutation takes the writer lock of the one compartment it touches,
/// loads it, applies its changes to the loaded copy, commits them in one
/// repository transaction and only then publishes the event batch.
pub struct InventoryEngine<R, P> {
    repository: Arc<R>,
    publisher: P,
    data: Arc<dyn ItemDataProvider>,
    locks: LockRegistry,
    reservations: ReservationRegistry,
    reservation_ttl: chrono::Duration,
}

impl<R, P> InventoryEngine<R, P>
where
    R: InventoryRepository,
    P: Publisher,
{
    pub fn new(
        repository: Arc<R>,
        publisher: P,
        data: Arc<dyn ItemDataProvider>,
        locks: LockRegistry,
        reservations: ReservationRegistry,
    ) -> Self {
        Self {
            repository,
            publisher,
            data,
            locks,
            reservations,
            reservation_ttl: chrono::Duration::seconds(30),
        }
    }

    pub fn with_reservation_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }

    pub fn reservations(&self) -> &ReservationRegistry {
        &self.reservations
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    async fn finish(&self, tenant: &Tenant, work: Work) -> Result<()> {
        if !work.changes.is_empty() {
            self.repository.commit(tenant.id, work.changes).await?;
        }
        for (key, from, to) in work.swaps {
            if let Some(inventory_type) = key.kind.inventory_type() {
                self.reservations
                    .swap_reservation(tenant.id, key.owner_id, inventory_type, from, to);
            }
        }

        let mut buffer = Buffer::new();
        for event in &work.events {
            buffer.put(Topic::EventInventoryChanged, event.character_id, tenant, event)?;
        }
        buffer.emit(&self.publisher).await?;
        Ok(())
    }

    fn reserved(&self, tenant: &Tenant, key: CompartmentKey, slot: i16, now: DateTime<Utc>) -> u32 {
        match key.kind.inventory_type() {
            Some(inventory_type) => {
                self.reservations
                    .get_reserved(tenant.id, key.owner_id, inventory_type, slot, now)
            }
            None => 0,
        }
    }

    /// Drops one holder of a reference, deleting it with its last holder.
    async fn release_reference(&self, tenant: &Tenant, work: &mut Work, reference_id: u32) -> Result<()> {
        match self.repository.reference(tenant.id, reference_id).await? {
            Some(reference) if reference.reference_count > 1 => {
                work.changes.push(Change::PutReference(AssetReference {
                    reference_count: reference.reference_count - 1,
                    ..reference
                }));
            }
            Some(_) => work.changes.push(Change::DeleteReference(reference_id)),
            None => tracing::warn!(reference_id, "released asset had no reference data"),
        }
        Ok(())
    }

    /// Exchanges the contents of two slots through the temporary slot.
    ///
    /// The displaced occupant is parked on [`TEMPORARY_SLOT`], the source
    /// asset takes the destination, then the occupant lands on the vacated
    /// source. Only final positions are persisted, so each asset gets a
    /// single MOVED event.
    fn shuffle(
        &self,
        compartment: &mut Compartment,
        work: &mut Work,
        source: i16,
        destination: i16,
    ) -> Result<()> {
        let moving = compartment
            .take(source)
            .ok_or(InventoryError::AssetNotFound {
                key: compartment.key,
                slot: source,
            })?;
        let parked = compartment.take(destination).map(|mut occupant| {
            occupant.slot = TEMPORARY_SLOT;
            occupant
        });

        let from = moving.slot;
        work.moved(compartment, moving, destination);
        if let Some(mut occupant) = parked {
            occupant.slot = destination;
            work.moved(compartment, occupant, from);
        }
        work.swaps.push((compartment.key, source, destination));
        Ok(())
    }

    /// Creates `quantity` of a template, topping up partial stacks first.
    /// A quantity of zero is treated as one.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn create_asset(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        template_id: TemplateId,
        quantity: u32,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<Vec<Asset>> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;
        let mut work = Work::new(transaction_id);

        let slot_max = slot_max_for(self.data.as_ref(), inventory_type, template_id);
        let mut running = quantity.max(1);
        let mut touched = Vec::new();

        if inventory_type.is_stackable() {
            let partial: Vec<Asset> = compartment
                .assets_of(template_id)
                .into_iter()
                .filter(|a| a.quantity < slot_max)
                .cloned()
                .collect();
            for mut asset in partial {
                if running == 0 {
                    break;
                }
                let delta = (slot_max - asset.quantity).min(running);
                asset.quantity += delta;
                running -= delta;
                touched.push(asset.clone());
                work.quantity_updated(&mut compartment, asset);
            }
        }

        while running > 0 {
            let slot = compartment
                .next_free_slot()
                .ok_or(InventoryError::CompartmentFull(key))?;
            let amount = running.min(slot_max);
            let id = self.repository.next_id().await?;
            let stats = (inventory_type == InventoryType::Equip).then(|| {
                self.data
                    .equipment_stats(template_id)
                    .unwrap_or_default()
            });
            work.changes.push(Change::PutReference(AssetReference {
                id,
                template_id,
                stats,
                reference_count: 1,
            }));
            let asset = Asset {
                id,
                slot,
                template_id,
                quantity: amount,
                expiration,
                reference_id: id,
            };
            touched.push(asset.clone());
            work.added(&mut compartment, asset);
            running -= amount;
        }

        self.finish(tenant, work).await?;
        Ok(touched)
    }

    /// Destroys `quantity` of a template across slots, lowest slot first.
    /// With `remove_all` every unreserved unit is destroyed. Returns the
    /// number of units destroyed.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn destroy_asset(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        template_id: TemplateId,
        quantity: u32,
        remove_all: bool,
    ) -> Result<u32> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;
        let mut work = Work::new(transaction_id);
        let now = Utc::now();

        let holdings: Vec<(Asset, u32)> = compartment
            .assets_of(template_id)
            .into_iter()
            .map(|a| {
                let available = a.quantity.saturating_sub(self.reserved(tenant, key, a.slot, now));
                (a.clone(), available)
            })
            .collect();
        let available: u32 = holdings.iter().map(|(_, available)| available).sum();
        let target = if remove_all { available } else { quantity };
        if target > available {
            return Err(InventoryError::NotEnoughQuantity {
                template_id,
                requested: target,
                available,
            });
        }

        let mut remaining = target;
        for (mut asset, free) in holdings {
            if remaining == 0 {
                break;
            }
            let take = free.min(remaining);
            if take == 0 {
                continue;
            }
            remaining -= take;
            if take == asset.quantity {
                work.removed(&mut compartment, asset.slot);
                self.release_reference(tenant, &mut work, asset.reference_id)
                    .await?;
            } else {
                asset.quantity -= take;
                work.quantity_updated(&mut compartment, asset);
            }
        }

        self.finish(tenant, work).await?;
        Ok(target)
    }

    /// Destroys from one slot. A quantity of zero destroys every unreserved unit.
    pub async fn destroy_asset_from_slot(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
        quantity: u32,
    ) -> Result<()> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;
        let mut work = Work::new(transaction_id);

        let mut asset = compartment
            .asset_at(slot)
            .cloned()
            .ok_or(InventoryError::AssetNotFound { key, slot })?;
        let available = asset
            .quantity
            .saturating_sub(self.reserved(tenant, key, slot, Utc::now()));
        let take = if quantity == 0 { available } else { quantity };
        if take > available || take == 0 {
            return Err(InventoryError::NotEnoughQuantity {
                template_id: asset.template_id,
                requested: take,
                available,
            });
        }

        if take == asset.quantity {
            work.removed(&mut compartment, slot);
            self.release_reference(tenant, &mut work, asset.reference_id)
                .await?;
        } else {
            asset.quantity -= take;
            work.quantity_updated(&mut compartment, asset);
        }
        self.finish(tenant, work).await
    }

    /// Moves an asset between two inventory slots, exchanging with any occupant.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn move_asset(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        source: i16,
        destination: i16,
    ) -> Result<()> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;

        for slot in [source, destination] {
            if slot <= 0 || slot > compartment.capacity as i16 {
                return Err(InventoryError::InvalidSlot(slot));
            }
        }
        if source == destination {
            return Ok(());
        }

        let mut work = Work::new(transaction_id);
        self.shuffle(&mut compartment, &mut work, source, destination)?;
        self.finish(tenant, work).await
    }

    /// Equips the asset at `source`. The destination defaults to the slot the
    /// template belongs in. Equipping an overall unequips pants, and equipping
    /// pants unequips an overall. Returns the destination.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn equip(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        source: i16,
        destination: Option<i16>,
    ) -> Result<i16> {
        let key = CompartmentKey::character(character_id, InventoryType::Equip);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;

        if source <= 0 {
            return Err(InventoryError::InvalidSlot(source));
        }
        let template_id = compartment
            .asset_at(source)
            .map(|a| a.template_id)
            .ok_or(InventoryError::AssetNotFound { key, slot: source })?;
        let destination = match destination {
            Some(destination) => destination,
            None => slot::equip_destination(template_id)
                .ok_or(InventoryError::NotEquipable(template_id))?,
        };
        if destination >= 0 || destination == TEMPORARY_SLOT {
            return Err(InventoryError::InvalidSlot(destination));
        }

        let mut work = Work::new(transaction_id);
        self.shuffle(&mut compartment, &mut work, source, destination)?;

        if slot::is_overall(template_id) {
            self.unequip_to_free_slot(&mut compartment, &mut work, slot::PANTS)?;
        }
        let top_is_overall = compartment
            .asset_at(slot::TOP)
            .is_some_and(|top| slot::is_overall(top.template_id));
        if destination == slot::PANTS && top_is_overall {
            self.unequip_to_free_slot(&mut compartment, &mut work, slot::TOP)?;
        }

        self.finish(tenant, work).await?;
        Ok(destination)
    }

    fn unequip_to_free_slot(
        &self,
        compartment: &mut Compartment,
        work: &mut Work,
        equipped: i16,
    ) -> Result<()> {
        let Some(asset) = compartment.take(equipped) else {
            return Ok(());
        };
        let Some(free) = compartment.next_free_slot() else {
            return Err(InventoryError::CompartmentFull(compartment.key));
        };
        work.moved(compartment, asset, free);
        Ok(())
    }

    /// Unequips the asset at `source` into `destination`, or the first free
    /// slot. An occupied destination is exchanged only when its asset fits
    /// the vacated equip slot. Returns the destination.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn unequip(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        source: i16,
        destination: Option<i16>,
    ) -> Result<i16> {
        let key = CompartmentKey::character(character_id, InventoryType::Equip);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;

        if source >= 0 || source == TEMPORARY_SLOT {
            return Err(InventoryError::InvalidSlot(source));
        }
        if compartment.asset_at(source).is_none() {
            return Err(InventoryError::AssetNotFound { key, slot: source });
        }
        let destination = match destination {
            Some(destination) => destination,
            None => compartment
                .next_free_slot()
                .ok_or(InventoryError::CompartmentFull(key))?,
        };
        if destination <= 0 || destination > compartment.capacity as i16 {
            return Err(InventoryError::InvalidSlot(destination));
        }
        if let Some(occupant) = compartment.asset_at(destination)
            && slot::equip_destination(occupant.template_id) != Some(source)
        {
            return Err(InventoryError::InvalidSlot(destination));
        }

        let mut work = Work::new(transaction_id);
        self.shuffle(&mut compartment, &mut work, source, destination)?;
        self.finish(tenant, work).await?;
        Ok(destination)
    }

    /// Holds `quantity` of the asset at `slot` for `transaction_id`.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    #[allow(clippy::too_many_arguments)]
    pub async fn reserve(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
        template_id: TemplateId,
        quantity: u32,
    ) -> Result<Reservation> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;
        let compartment = self.repository.load(tenant.id, key).await?;

        let asset = compartment
            .asset_at(slot)
            .filter(|a| a.template_id == template_id)
            .ok_or(InventoryError::AssetNotFound { key, slot })?;
        if quantity > asset.quantity {
            return Err(InventoryError::NotEnoughQuantity {
                template_id,
                requested: quantity,
                available: asset.quantity,
            });
        }

        let reservation = self.reservations.add(
            tenant.id,
            transaction_id,
            character_id,
            inventory_type,
            slot,
            template_id,
            quantity,
            self.reservation_ttl,
            Utc::now(),
        )?;

        let mut work = Work::new(transaction_id);
        work.event(
            key,
            slot,
            InventoryChangeKind::Reserved {
                template_id,
                quantity: reservation.quantity,
            },
        );
        self.finish(tenant, work).await?;
        Ok(reservation)
    }

    /// Releases a reservation. Releasing one that no longer exists is a no-op.
    pub async fn cancel_reservation(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
    ) -> Result<()> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;

        let Some(reservation) = self.reservations.remove(
            tenant.id,
            transaction_id,
            character_id,
            inventory_type,
            slot,
        ) else {
            return Ok(());
        };

        let mut work = Work::new(transaction_id);
        work.event(
            key,
            slot,
            InventoryChangeKind::ReservationCancelled {
                template_id: reservation.template_id,
                quantity: reservation.quantity,
            },
        );
        self.finish(tenant, work).await
    }

    /// Turns a reservation into a real debit.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn consume_reservation(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        inventory_type: InventoryType,
        slot: i16,
    ) -> Result<()> {
        let key = CompartmentKey::character(character_id, inventory_type);
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;

        let reservation = self
            .reservations
            .get(tenant.id, character_id, inventory_type, slot, Utc::now())
            .filter(|r| r.transaction_id == transaction_id)
            .ok_or(InventoryError::ReservationNotFound { slot })?;
        let mut asset = compartment
            .asset_at(slot)
            .cloned()
            .ok_or(InventoryError::AssetNotFound { key, slot })?;
        if reservation.quantity > asset.quantity {
            return Err(InventoryError::NotEnoughQuantity {
                template_id: asset.template_id,
                requested: reservation.quantity,
                available: asset.quantity,
            });
        }

        let mut work = Work::new(transaction_id);
        if reservation.quantity == asset.quantity {
            work.removed(&mut compartment, slot);
            self.release_reference(tenant, &mut work, asset.reference_id)
                .await?;
        } else {
            asset.quantity -= reservation.quantity;
            work.quantity_updated(&mut compartment, asset);
        }
        self.finish(tenant, work).await?;

        self.reservations
            .remove(tenant.id, transaction_id, character_id, inventory_type, slot);
        Ok(())
    }

    /// Places an asset for an existing reference into `key`, sharing the
    /// reference with whichever compartment still holds it.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn accept(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        key: CompartmentKey,
        reference_id: u32,
        quantity: u32,
    ) -> Result<Asset> {
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;

        if let Some(existing) = compartment
            .assets()
            .find(|a| a.reference_id == reference_id)
        {
            return Ok(existing.clone());
        }

        let reference = self
            .repository
            .reference(tenant.id, reference_id)
            .await?
            .ok_or(InventoryError::ReferenceNotFound(reference_id))?;
        let slot = compartment
            .next_free_slot()
            .ok_or(InventoryError::CompartmentFull(key))?;

        let mut work = Work::new(transaction_id);
        let asset = Asset {
            id: self.repository.next_id().await?,
            slot,
            template_id: reference.template_id,
            quantity: quantity.max(1),
            expiration: None,
            reference_id,
        };
        work.changes.push(Change::PutReference(AssetReference {
            reference_count: reference.reference_count + 1,
            ..reference
        }));
        work.added(&mut compartment, asset.clone());
        self.finish(tenant, work).await?;
        Ok(asset)
    }

    /// Removes an asset from `key`, dropping its hold on the reference.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn release(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        key: CompartmentKey,
        asset_id: u32,
    ) -> Result<Asset> {
        let _guard = self.locks.write(tenant.id, key).await;
        let mut compartment = self.repository.load(tenant.id, key).await?;

        let asset = compartment
            .asset_by_id(asset_id)
            .cloned()
            .ok_or(InventoryError::AssetIdNotFound { key, asset_id })?;
        if self.reserved(tenant, key, asset.slot, Utc::now()) > 0 {
            return Err(InventoryError::SlotReserved { slot: asset.slot });
        }

        let mut work = Work::new(transaction_id);
        work.removed(&mut compartment, asset.slot);
        self.release_reference(tenant, &mut work, asset.reference_id)
            .await?;
        self.finish(tenant, work).await?;
        Ok(asset)
    }

    /// Replaces the stats of the equipable at `slot` (scrolls, upgrades).
    pub async fn update_equipment_stats(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        character_id: CharacterId,
        slot: i16,
        stats: EquipmentStats,
    ) -> Result<()> {
        let key = CompartmentKey::character(character_id, InventoryType::Equip);
        let _guard = self.locks.write(tenant.id, key).await;
        let compartment = self.repository.load(tenant.id, key).await?;

        let asset = compartment
            .asset_at(slot)
            .ok_or(InventoryError::AssetNotFound { key, slot })?;
        let reference = self
            .repository
            .reference(tenant.id, asset.reference_id)
            .await?
            .ok_or(InventoryError::ReferenceNotFound(asset.reference_id))?;

        let mut work = Work::new(transaction_id);
        work.changes.push(Change::PutReference(AssetReference {
            stats: Some(stats),
            ..reference
        }));
        work.event(
            key,
            slot,
            InventoryChangeKind::AttributeUpdated {
                asset_id: asset.id,
                stats,
            },
        );
        self.finish(tenant, work).await
    }

    /// Consistent snapshot of a compartment.
    pub async fn get_compartment(&self, tenant: &Tenant, key: CompartmentKey) -> Result<Compartment> {
        let _guard = self.locks.read(tenant.id, key).await;
        self.repository.load(tenant.id, key).await
    }

    /// Reference data of an asset (template and equipment stats).
    pub async fn get_reference(&self, tenant: &Tenant, reference_id: u32) -> Result<AssetReference> {
        self.repository
            .reference(tenant.id, reference_id)
            .await?
            .ok_or(InventoryError::ReferenceNotFound(reference_id))
    }
}
