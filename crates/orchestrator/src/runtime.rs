//! Service wiring: engines, bus consumers and background tasks.

use std::sync::Arc;

use bus::{InMemoryBus, MessageHandler, Topic, spawn_consumer};
use drops::{DropCommandHandler, DropExpirationTask, DropProcessor, DropRegistry};
use inventory::{
    InventoryCommandHandler, InventoryEngine, InventoryRepository, ItemDataProvider, LockRegistry,
    ReservationRegistry, StaticItemData,
};
use quest::{
    InMemoryQuestRepository, QuestCommandHandler, QuestDefinition, QuestDefinitionProvider,
    QuestEngine, StaticQuestDefinitions,
};
use reactor::{ReactorCommandHandler, ScriptProcessor, ScriptProvider, StaticScripts};
use saga::{
    CompartmentStatusHandler, DropStatusHandler, EngineConfig, QuestStatusHandler,
    SagaCommandHandler, SagaEngine, ServiceStatusHandler, SweeperConfig, TimeoutSweeper,
};
use saga_store::SagaStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::StartupError;

/// Storage backends chosen at start-up.
pub struct Backends<S, R, D> {
    pub sagas: Arc<S>,
    pub inventory: Arc<R>,
    pub drops: Arc<D>,
}

/// Static game data the engines consult.
pub struct Catalog {
    pub items: Arc<dyn ItemDataProvider>,
    pub quests: Arc<dyn QuestDefinitionProvider>,
    pub scripts: Arc<dyn ScriptProvider>,
}

impl Catalog {
    /// Empty catalog; every lookup misses.
    pub fn empty() -> Self {
        Self {
            items: Arc::new(StaticItemData::new()),
            quests: Arc::new(StaticQuestDefinitions::new()),
            scripts: Arc::new(StaticScripts::new()),
        }
    }

    /// Loads the quest definitions and reactor scripts named in `config`.
    pub fn load(config: &Config) -> Result<Self, StartupError> {
        let mut catalog = Self::empty();
        if let Some(path) = &config.quest_definition_file {
            let definitions: Vec<QuestDefinition> = serde_json::from_slice(&std::fs::read(path)?)?;
            tracing::info!(count = definitions.len(), path = %path.display(), "loaded quest definitions");
            catalog.quests = Arc::new(
                definitions
                    .into_iter()
                    .fold(StaticQuestDefinitions::new(), StaticQuestDefinitions::with),
            );
        }
        if let Some(dir) = &config.reactor_script_dir {
            let scripts = StaticScripts::from_dir(dir)?;
            tracing::info!(count = scripts.len(), dir = %dir.display(), "loaded reactor scripts");
            catalog.scripts = Arc::new(scripts);
        }
        Ok(catalog)
    }
}

/// A running orchestrator: the saga engine plus every task serving it.
pub struct Runtime<S> {
    engine: Arc<SagaEngine<S, InMemoryBus>>,
    shutdown: watch::Sender<bool>,
    /// Periodic tasks that stop on the shutdown signal, with their names.
    periodic: Vec<(&'static str, JoinHandle<()>)>,
    consumers: Vec<JoinHandle<()>>,
}

impl<S: SagaStore + 'static> Runtime<S> {
    /// Builds every engine over `bus`, subscribes the consumers, recovers
    /// stranded sagas and starts the periodic tasks.
    pub async fn start<R, D>(
        config: &Config,
        bus: InMemoryBus,
        backends: Backends<S, R, D>,
        catalog: Catalog,
    ) -> Result<Self, StartupError>
    where
        R: InventoryRepository + 'static,
        D: DropRegistry + 'static,
    {
        let engine = Arc::new(
            SagaEngine::new(backends.sagas, bus.clone()).with_config(EngineConfig {
                default_timeout: chrono_duration(config.saga_timeout),
                ..EngineConfig::default()
            }),
        );

        let reservations = ReservationRegistry::new();
        let inventory = Arc::new(
            InventoryEngine::new(
                backends.inventory,
                bus.clone(),
                catalog.items,
                LockRegistry::new(),
                reservations.clone(),
            )
            .with_reservation_ttl(chrono_duration(config.reservation_ttl)),
        );
        let drops = Arc::new(DropProcessor::new(backends.drops, bus.clone()));
        let quests = Arc::new(QuestEngine::new(
            Arc::new(InMemoryQuestRepository::new()),
            catalog.quests,
            bus.clone(),
        ));
        let reactors = Arc::new(ScriptProcessor::new(catalog.scripts, bus.clone()));

        let routes: Vec<(Topic, Arc<dyn MessageHandler>)> = vec![
            (
                Topic::CommandInventory,
                Arc::new(InventoryCommandHandler::new(inventory)),
            ),
            (Topic::CommandDrop, Arc::new(DropCommandHandler::new(drops.clone()))),
            (Topic::CommandQuest, Arc::new(QuestCommandHandler::new(quests))),
            (
                Topic::CommandReactorActions,
                Arc::new(ReactorCommandHandler::new(reactors)),
            ),
            (
                Topic::CommandSaga,
                Arc::new(SagaCommandHandler::new(engine.clone())),
            ),
            (
                Topic::EventCompartmentStatus,
                Arc::new(CompartmentStatusHandler::new(engine.clone())),
            ),
            (
                Topic::EventDropStatus,
                Arc::new(DropStatusHandler::new(engine.clone())),
            ),
            (
                Topic::EventQuestStatus,
                Arc::new(QuestStatusHandler::new(engine.clone())),
            ),
            (
                Topic::EventCharacterStatus,
                Arc::new(ServiceStatusHandler::new(engine.clone())),
            ),
        ];

        let mut consumers = Vec::with_capacity(routes.len());
        for (topic, handler) in routes {
            tracing::debug!(topic = %topic.name(), consumer = handler.name(), "subscribing");
            consumers.push(spawn_consumer(handler, bus.subscribe(topic).await));
        }

        let resumed = saga::recover(&engine).await?;
        tracing::info!(resumed, "recovered sagas");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let sweeper = TimeoutSweeper::new(
            engine.clone(),
            SweeperConfig {
                interval: config.saga_sweep_interval,
                batch: config.saga_sweep_batch,
                ..SweeperConfig::default()
            },
        )
        .spawn(shutdown_rx.clone());
        let expiration = DropExpirationTask::new(drops, config.drop_lifetime, config.drop_expiry_interval)
            .spawn(shutdown_rx.clone());
        let reservation_sweeper =
            reservations.spawn_sweeper(config.reservation_sweep_interval, shutdown_rx);

        Ok(Self {
            engine,
            shutdown,
            periodic: vec![
                ("timeout sweeper", sweeper),
                ("drop expiration", expiration),
                ("reservation sweeper", reservation_sweeper),
            ],
            consumers,
        })
    }

    pub fn engine(&self) -> &Arc<SagaEngine<S, InMemoryBus>> {
        &self.engine
    }

    /// Stops the periodic tasks after their current pass, then the consumers.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (name, task) in self.periodic {
            if let Err(e) = task.await {
                tracing::warn!(task = name, error = %e, "periodic task ended abnormally");
            }
        }
        for task in self.consumers {
            task.abort();
        }
        tracing::info!("orchestrator tasks stopped");
    }
}

fn chrono_duration(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365))
}
