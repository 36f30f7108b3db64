//! A reactor trigger flowing through the saga engine into the drop registry.

use std::sync::Arc;

use bus::{InMemoryBus, Message, MessageHandler, Topic};
use common::{Field, Tenant, TenantId};
use drops::{DropCommandHandler, DropProcessor, InMemoryDropRegistry};
use reactor::{
    Condition, Operation, ReactorCommand, ReactorCommandHandler, ReactorCommandKind, ReactorScript,
    Rule, ScriptProcessor, StaticScripts,
};
use saga::{SagaCommandHandler, SagaEngine, SagaStatusEvent};
use saga_store::InMemorySagaStore;
use tokio::sync::mpsc::UnboundedReceiver;

struct TestHarness {
    bus: InMemoryBus,
    tenant: Tenant,
    drops: Arc<DropProcessor<InMemoryDropRegistry, InMemoryBus>>,
    routes: Vec<(UnboundedReceiver<Message>, Arc<dyn MessageHandler>)>,
}

impl TestHarness {
    async fn new(scripts: StaticScripts) -> Self {
        let bus = InMemoryBus::new();
        let engine = Arc::new(SagaEngine::new(
            Arc::new(InMemorySagaStore::new()),
            bus.clone(),
        ));
        let drops = Arc::new(DropProcessor::new(
            Arc::new(InMemoryDropRegistry::new()),
            bus.clone(),
        ));
        let processor = Arc::new(ScriptProcessor::new(Arc::new(scripts), bus.clone()));

        let handlers: Vec<(Topic, Arc<dyn MessageHandler>)> = vec![
            (
                Topic::CommandReactorActions,
                Arc::new(ReactorCommandHandler::new(processor)),
            ),
            (Topic::CommandSaga, Arc::new(SagaCommandHandler::new(engine))),
            (Topic::CommandDrop, Arc::new(DropCommandHandler::new(drops.clone()))),
        ];
        let mut routes = Vec::new();
        for (topic, handler) in handlers {
            routes.push((bus.subscribe(topic).await, handler));
        }

        Self {
            bus,
            tenant: Tenant::new(TenantId::new(), "GMS", 83, 1),
            drops,
            routes,
        }
    }

    async fn send(&mut self, command: &ReactorCommand) {
        let message =
            Message::new(Topic::CommandReactorActions, command.reactor_id, &self.tenant, command)
                .unwrap();
        self.routes[0].1.handle(&message).await.unwrap();
        loop {
            let mut delivered = false;
            for (rx, handler) in self.routes.iter_mut() {
                while let Ok(message) = rx.try_recv() {
                    handler.handle(&message).await.unwrap();
                    delivered = true;
                }
            }
            if !delivered {
                return;
            }
        }
    }
}

fn command(reactor_state: i8, kind: ReactorCommandKind) -> ReactorCommand {
    ReactorCommand {
        world_id: 0,
        channel_id: 1,
        map_id: 108000600,
        reactor_id: 55,
        classification: "1082000".to_string(),
        reactor_name: "box1".to_string(),
        reactor_state,
        x: 100,
        y: 200,
        kind,
    }
}

fn box_script() -> StaticScripts {
    StaticScripts::new().with(
        ReactorScript::new("1082000").act_rule(
            Rule::new("open")
                .when(Condition::state(">=", 3))
                .then(
                    Operation::new("drop_items")
                        .param("items", "4031161:1,2000000:5")
                        .param("meso", "true")
                        .param("mesoMin", "30")
                        .param("mesoMax", "30"),
                ),
        ),
    )
}

#[tokio::test]
async fn test_trigger_spawns_reactor_drops() {
    let mut h = TestHarness::new(box_script()).await;
    h.send(&command(3, ReactorCommandKind::Trigger { character_id: 42 }))
        .await;

    let field = Field::new(0, 1, 108000600);
    let mut drops = h.drops.get_for_map(&h.tenant, &field).await.unwrap();
    drops.sort_by_key(|d| d.position().0);
    assert_eq!(drops.len(), 3);
    let xs: Vec<i16> = drops.iter().map(|d| d.position().0).collect();
    assert_eq!(xs, [75, 100, 125]);
    assert!(drops.iter().all(|d| d.owner_id() == 42 && d.dropper_id() == 55));
    assert_eq!(drops[2].meso(), 30);

    let events: Vec<SagaStatusEvent> = h.bus.decoded_on(Topic::EventSagaStatus).await;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_completed());
}

#[tokio::test]
async fn test_state_below_threshold_does_nothing() {
    let mut h = TestHarness::new(box_script()).await;
    h.send(&command(1, ReactorCommandKind::Trigger { character_id: 42 }))
        .await;

    assert!(h.bus.messages_on(Topic::CommandSaga).await.is_empty());
    let field = Field::new(0, 1, 108000600);
    assert!(h.drops.get_for_map(&h.tenant, &field).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_broken_script_is_acked() {
    let scripts = StaticScripts::new().with(
        ReactorScript::new("1082000").hit_rule(
            Rule::new("bad")
                .when(Condition::state("=", 0))
                .then(Operation::new("spawn_monster")),
        ),
    );
    let mut h = TestHarness::new(scripts).await;
    h.send(&command(
        0,
        ReactorCommandKind::Hit {
            character_id: 42,
            skill_id: 0,
            is_skill: false,
        },
    ))
    .await;
    assert!(h.bus.messages_on(Topic::CommandSaga).await.is_empty());
}
