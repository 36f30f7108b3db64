//! Quest chain scenarios through the engine and the command consumer.

use std::sync::Arc;

use bus::{InMemoryBus, Message, MessageHandler, Topic};
use common::{Tenant, TenantId, TransactionId};
use quest::{
    InMemoryQuestRepository, QuestCommand, QuestCommandHandler, QuestCommandKind, QuestDefinition,
    QuestEngine, QuestState, QuestStatusEvent, QuestStatusKind, StaticQuestDefinitions,
};

const Q1: u32 = 2100;
const Q2: u32 = 2101;
const MOB: u32 = 9300018;
const CHARACTER: u32 = 12345;

struct TestHarness {
    engine: Arc<QuestEngine<InMemoryQuestRepository, InMemoryBus>>,
    handler: QuestCommandHandler<InMemoryQuestRepository, InMemoryBus>,
    bus: InMemoryBus,
    tenant: Tenant,
}

impl TestHarness {
    fn new() -> Self {
        let definitions = StaticQuestDefinitions::new()
            .with(
                QuestDefinition::new(Q1)
                    .requires_kills(MOB, 5)
                    .auto_complete()
                    .chained_to(Q2),
            )
            .with(
                QuestDefinition::new(Q2)
                    .requires_kills(100100, 10)
                    .requires_visit(104000000),
            );
        let bus = InMemoryBus::new();
        let engine = Arc::new(QuestEngine::new(
            Arc::new(InMemoryQuestRepository::new()),
            Arc::new(definitions),
            bus.clone(),
        ));
        Self {
            handler: QuestCommandHandler::new(engine.clone()),
            engine,
            bus,
            tenant: Tenant::new(TenantId::new(), "GMS", 83, 1),
        }
    }

    async fn send(&self, kind: QuestCommandKind) {
        let command = QuestCommand {
            transaction_id: TransactionId::new(),
            character_id: CHARACTER,
            correlation_id: None,
            kind,
        };
        let message = Message::new(Topic::CommandQuest, CHARACTER, &self.tenant, &command).unwrap();
        self.handler.handle(&message).await.unwrap();
    }
}

#[tokio::test]
async fn auto_complete_returns_the_chain_and_starts_the_next_quest() {
    let h = TestHarness::new();
    h.engine
        .start(&h.tenant, TransactionId::new(), CHARACTER, Q1)
        .await
        .unwrap();
    h.engine
        .set_progress(&h.tenant, TransactionId::new(), CHARACTER, Q1, MOB, "005".to_string())
        .await
        .unwrap();

    let completion = h
        .engine
        .check_auto_complete(&h.tenant, TransactionId::new(), CHARACTER, Q1)
        .await
        .unwrap()
        .unwrap();

    let q1 = h.engine.get(&h.tenant, CHARACTER, Q1).await.unwrap().unwrap();
    assert_eq!(q1.state, QuestState::Completed);
    assert_eq!(q1.completed_count, 1);
    assert_eq!(completion.next_quest_id, Some(Q2));

    let q2 = h
        .engine
        .start_chained(&h.tenant, TransactionId::new(), CHARACTER, Q2)
        .await
        .unwrap();
    assert_eq!(q2.state, QuestState::Started);
    assert_eq!(q2.progress_of(100100), Some("000"));
    assert_eq!(q2.progress_of(104000000), Some("0"));
}

#[tokio::test]
async fn kills_reported_on_the_bus_complete_and_chain() {
    let h = TestHarness::new();
    h.send(QuestCommandKind::Start { quest_id: Q1, chained: false })
        .await;
    for _ in 0..5 {
        h.send(QuestCommandKind::MonsterKilled { monster_id: MOB }).await;
    }

    let q1 = h.engine.get(&h.tenant, CHARACTER, Q1).await.unwrap().unwrap();
    assert_eq!(q1.state, QuestState::Completed);
    assert_eq!(q1.progress_of(MOB), Some("005"));
    let q2 = h.engine.get(&h.tenant, CHARACTER, Q2).await.unwrap().unwrap();
    assert_eq!(q2.state, QuestState::Started);

    let events: Vec<QuestStatusEvent> = h.bus.decoded_on(Topic::EventQuestStatus).await;
    let completed: Vec<_> = events
        .iter()
        .filter(|e| matches!(e.kind, QuestStatusKind::Completed { .. }))
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(
        completed[0].kind,
        QuestStatusKind::Completed { next_quest_id: Some(Q2) }
    );
}

#[tokio::test]
async fn extra_kills_past_the_requirement_are_not_counted() {
    let h = TestHarness::new();
    h.send(QuestCommandKind::Start { quest_id: Q2, chained: true })
        .await;
    for _ in 0..12 {
        h.send(QuestCommandKind::MonsterKilled { monster_id: 100100 }).await;
    }
    h.send(QuestCommandKind::MapEntered { map_id: 104000000 }).await;

    let q2 = h.engine.get(&h.tenant, CHARACTER, Q2).await.unwrap().unwrap();
    assert_eq!(q2.progress_of(100100), Some("010"));
    assert_eq!(q2.progress_of(104000000), Some("1"));
    // Q2 is not auto-complete; it stays open until completed explicitly.
    assert_eq!(q2.state, QuestState::Started);
}
