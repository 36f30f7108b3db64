use std::sync::Arc;
use std::time::Duration;

use bus::Publisher;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{DropProcessor, DropRegistry, DropStatus, Result};

/// Periodically removes drops that have outlived their lifetime.
///
/// Reserved drops are skipped; a pickup in flight finishes or cancels first.
pub struct DropExpirationTask<R, P> {
    processor: Arc<DropProcessor<R, P>>,
    lifetime: chrono::Duration,
    interval: Duration,
}

impl<R, P> DropExpirationTask<R, P>
where
    R: DropRegistry + 'static,
    P: Publisher + 'static,
{
    pub fn new(processor: Arc<DropProcessor<R, P>>, lifetime: Duration, interval: Duration) -> Self {
        Self {
            processor,
            lifetime: chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::days(365)),
            interval,
        }
    }

    /// Expires every drop older than the lifetime as of `now`.
    /// Returns how many drops this pass removed.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut expired = 0;
        for (tenant, drop) in self.processor.registry().get_all_drops().await? {
            if drop.status() == DropStatus::Reserved || drop.drop_time() + self.lifetime > now {
                continue;
            }
            if self.processor.expire(&tenant, &drop).await? {
                expired += 1;
            }
        }
        if expired > 0 {
            tracing::debug!(expired, "expired drops");
        }
        Ok(expired)
    }

    /// Runs passes until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "drop expiration pass failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("drop expiration stopping");
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
