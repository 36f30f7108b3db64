//! Compartment engine scenarios driven through the command consumer.

use std::sync::Arc;

use bus::{InMemoryBus, Message, MessageHandler, Topic};
use common::{CharacterId, InventoryType, Tenant, TenantId, TransactionId};
use inventory::{
    CompartmentKey, CompartmentStatusEvent, CompartmentStatusKind, InMemoryInventoryRepository,
    InventoryChangeKind, InventoryChangedEvent, InventoryCommand, InventoryCommandHandler,
    InventoryCommandKind, InventoryEngine, LockRegistry, ReservationRegistry, StaticItemData,
};

const OVERALL: u32 = 1050000;
const PANTS: u32 = 1060002;
const SWORD: u32 = 1302000;

struct TestHarness {
    engine: Arc<InventoryEngine<InMemoryInventoryRepository, InMemoryBus>>,
    handler: InventoryCommandHandler<InMemoryInventoryRepository, InMemoryBus>,
    bus: InMemoryBus,
    tenant: Tenant,
}

impl TestHarness {
    fn new() -> Self {
        let bus = InMemoryBus::new();
        let engine = Arc::new(InventoryEngine::new(
            Arc::new(InMemoryInventoryRepository::new()),
            bus.clone(),
            Arc::new(StaticItemData::new().with_slot_max(2000000, 200)),
            LockRegistry::new(),
            ReservationRegistry::new(),
        ));
        Self {
            handler: InventoryCommandHandler::new(engine.clone()),
            engine,
            bus,
            tenant: Tenant::new(TenantId::new(), "GMS", 83, 1),
        }
    }

    async fn create(&self, character_id: CharacterId, template_id: u32, quantity: u32) {
        let inventory_type = InventoryType::from_template_id(template_id).unwrap();
        self.engine
            .create_asset(
                &self.tenant,
                TransactionId::new(),
                character_id,
                inventory_type,
                template_id,
                quantity,
                None,
            )
            .await
            .unwrap();
    }

    async fn send(&self, character_id: CharacterId, kind: InventoryCommandKind) -> TransactionId {
        let transaction_id = TransactionId::new();
        let command = InventoryCommand {
            transaction_id,
            character_id,
            correlation_id: None,
            kind,
        };
        let message = Message::new(Topic::CommandInventory, character_id, &self.tenant, &command).unwrap();
        self.handler.handle(&message).await.unwrap();
        transaction_id
    }

    async fn statuses(&self) -> Vec<CompartmentStatusEvent> {
        self.bus.decoded_on(Topic::EventCompartmentStatus).await
    }

    async fn changes(&self) -> Vec<InventoryChangedEvent> {
        self.bus.decoded_on(Topic::EventInventoryChanged).await
    }

    async fn equip_tab(&self, character_id: CharacterId) -> inventory::Compartment {
        self.engine
            .get_compartment(&self.tenant, CompartmentKey::character(character_id, InventoryType::Equip))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn equipping_an_overall_unequips_pants() {
    let h = TestHarness::new();
    for _ in 0..4 {
        h.create(42, SWORD, 1).await;
    }
    h.create(42, OVERALL, 1).await;
    h.create(42, PANTS, 1).await;
    h.engine
        .equip(&h.tenant, TransactionId::new(), 42, 6, None)
        .await
        .unwrap();
    let before = h.equip_tab(42).await;
    assert_eq!(before.asset_at(5).unwrap().template_id, OVERALL);
    assert_eq!(before.asset_at(-6).unwrap().template_id, PANTS);
    h.bus.clear().await;

    let tx = h
        .send(42, InventoryCommandKind::Equip { source: 5, destination: Some(-5) })
        .await;

    let after = h.equip_tab(42).await;
    assert_eq!(after.asset_at(-5).unwrap().template_id, OVERALL);
    assert!(after.asset_at(-6).is_none());
    assert_eq!(after.asset_at(5).unwrap().template_id, PANTS);

    let changes = h.changes().await;
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|e| e.transaction_id == tx));
    assert!(matches!(changes[0].kind, InventoryChangeKind::Moved { old_slot: 5, .. }));
    assert_eq!(changes[0].slot, -5);
    assert!(matches!(changes[1].kind, InventoryChangeKind::Moved { old_slot: -6, .. }));
    assert_eq!(changes[1].slot, 5);

    let statuses = h.statuses().await;
    assert_eq!(statuses.len(), 1);
    assert!(matches!(
        statuses[0].kind,
        CompartmentStatusKind::Completed { slot: Some(-5), .. }
    ));
}

#[tokio::test]
async fn equipping_pants_unequips_an_equipped_overall() {
    let h = TestHarness::new();
    h.create(7, OVERALL, 1).await;
    h.create(7, PANTS, 1).await;
    h.engine
        .equip(&h.tenant, TransactionId::new(), 7, 1, None)
        .await
        .unwrap();

    h.send(7, InventoryCommandKind::Equip { source: 2, destination: None })
        .await;

    let tab = h.equip_tab(7).await;
    assert_eq!(tab.asset_at(-6).unwrap().template_id, PANTS);
    assert!(tab.asset_at(-5).is_none());
    assert_eq!(tab.asset_at(1).unwrap().template_id, OVERALL);
}

#[tokio::test]
async fn equip_then_unequip_restores_the_layout() {
    let h = TestHarness::new();
    h.create(9, SWORD, 1).await;
    h.create(9, 1302001, 1).await;
    let original = h.equip_tab(9).await.layout();

    h.send(9, InventoryCommandKind::Equip { source: 1, destination: None })
        .await;
    assert_eq!(h.equip_tab(9).await.asset_at(-11).unwrap().template_id, SWORD);

    h.send(9, InventoryCommandKind::Unequip { source: -11, destination: Some(1) })
        .await;
    assert_eq!(h.equip_tab(9).await.layout(), original);
}

#[tokio::test]
async fn equipping_onto_an_occupied_slot_swaps_through_the_temporary_slot() {
    let h = TestHarness::new();
    h.create(3, SWORD, 1).await;
    h.create(3, 1302001, 1).await;
    h.send(3, InventoryCommandKind::Equip { source: 1, destination: None })
        .await;
    h.bus.clear().await;

    h.send(3, InventoryCommandKind::Equip { source: 2, destination: None })
        .await;

    let tab = h.equip_tab(3).await;
    assert_eq!(tab.asset_at(-11).unwrap().template_id, 1302001);
    assert_eq!(tab.asset_at(2).unwrap().template_id, SWORD);
    let changes = h.changes().await;
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|e| e.slot != common::TEMPORARY_SLOT));
}

#[tokio::test]
async fn stacking_respects_slot_max_across_commands() {
    let h = TestHarness::new();
    h.send(
        1,
        InventoryCommandKind::CreateAsset {
            inventory_type: InventoryType::Use,
            template_id: 2000000,
            quantity: 150,
            expiration: None,
        },
    )
    .await;
    h.send(
        1,
        InventoryCommandKind::CreateAsset {
            inventory_type: InventoryType::Use,
            template_id: 2000000,
            quantity: 100,
            expiration: None,
        },
    )
    .await;

    let tab = h
        .engine
        .get_compartment(&h.tenant, CompartmentKey::character(1, InventoryType::Use))
        .await
        .unwrap();
    assert_eq!(tab.asset_at(1).unwrap().quantity, 200);
    assert_eq!(tab.asset_at(2).unwrap().quantity, 50);
    assert_eq!(tab.len(), 2);
}

#[tokio::test]
async fn full_inventory_reports_an_error_status() {
    let h = TestHarness::new();
    for _ in 0..24 {
        h.create(5, SWORD, 1).await;
    }
    h.bus.clear().await;

    let tx = h
        .send(
            5,
            InventoryCommandKind::CreateAsset {
                inventory_type: InventoryType::Equip,
                template_id: SWORD,
                quantity: 1,
                expiration: None,
            },
        )
        .await;

    let statuses = h.statuses().await;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].transaction_id, tx);
    assert!(matches!(
        statuses[0].kind,
        CompartmentStatusKind::Error { ref error_code, .. } if error_code == "inventory_full"
    ));
    assert!(h.changes().await.is_empty());
}
