//! Startup recovery of sagas stranded by a previous process.

use bus::Publisher;
use futures_util::future::join_all;
use saga_store::SagaStore;

use crate::{Result, SagaEngine};

/// Loads every live saga into the cache and re-drives it.
///
/// A saga waiting on a step event has its step command dispatched again;
/// the owning services treat repeats of an applied command as no-ops or
/// answer with a status the engine ignores. Returns how many sagas resumed.
#[tracing::instrument(skip(engine))]
pub async fn recover<S, P>(engine: &SagaEngine<S, P>) -> Result<usize>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    let records = engine.store().get_all_active().await?;
    if records.is_empty() {
        tracing::info!("no sagas to recover");
        return Ok(0);
    }

    let mut adopted = Vec::with_capacity(records.len());
    for record in &records {
        match engine.adopt(record).await {
            Ok(_) => adopted.push(record),
            Err(e) => tracing::error!(
                transaction_id = %record.transaction_id,
                error = %e,
                "unreadable saga record skipped"
            ),
        }
    }

    let results = join_all(
        adopted
            .iter()
            .map(|record| engine.advance(&record.tenant, record.transaction_id)),
    )
    .await;

    let mut resumed = 0;
    for (record, result) in adopted.iter().zip(results) {
        match result {
            Ok(()) => resumed += 1,
            Err(e) => tracing::error!(
                transaction_id = %record.transaction_id,
                error = %e,
                "failed to resume saga"
            ),
        }
    }
    tracing::info!(resumed, total = records.len(), "saga recovery finished");
    Ok(resumed)
}
