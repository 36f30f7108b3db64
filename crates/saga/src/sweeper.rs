//! Background task that fails sagas past their deadline.

use std::sync::Arc;
use std::time::Duration;

use bus::Publisher;
use chrono::{DateTime, Utc};
use saga_store::SagaStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{Result, SagaEngine};

/// Sweeper settings.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between passes.
    pub interval: Duration,
    /// Maximum sagas claimed per pass.
    pub batch: i64,
    /// How far a claimed saga's deadline is pushed so other instances skip it.
    pub lease: chrono::Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            batch: 100,
            lease: chrono::Duration::seconds(30),
        }
    }
}

/// Claims timed-out Active sagas and hands them to the engine.
pub struct TimeoutSweeper<S, P> {
    engine: Arc<SagaEngine<S, P>>,
    config: SweeperConfig,
}

impl<S, P> TimeoutSweeper<S, P>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    pub fn new(engine: Arc<SagaEngine<S, P>>, config: SweeperConfig) -> Self {
        Self { engine, config }
    }

    /// Runs one pass as of `now`. Returns how many sagas were timed out.
    ///
    /// A saga that fails to time out stays claimed until its lease runs
    /// out and is picked up again by a later pass.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let claimed = self
            .engine
            .store()
            .claim_timed_out(now, self.config.lease, self.config.batch)
            .await?;

        let mut timed_out = 0;
        for record in claimed {
            let transaction_id = record.transaction_id;
            let outcome = match self.engine.adopt(&record).await {
                Ok(_) => self.engine.time_out(&record.tenant, transaction_id).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => timed_out += 1,
                Err(e) => {
                    tracing::error!(%transaction_id, error = %e, "failed to time out saga");
                }
            }
        }
        if timed_out > 0 {
            tracing::info!(timed_out, "timeout sweep finished");
        }
        Ok(timed_out)
    }

    /// Runs passes until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "timeout sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("timeout sweeper stopping");
                        return;
                    }
                }
            }
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
