//! Saga engine.
//!
//! Owns the lifecycle of every saga: creation, correlation of status
//! events to steps, compensation and terminal emission. Every transition
//! is computed on a fresh value, validated, and written back with
//! optimistic locking; side effects run only after the write succeeded.

use std::sync::Arc;

use bus::{Buffer, Publisher, Topic};
use chrono::{DateTime, Duration, Utc};
use common::{Origin, Tenant, TenantId, TransactionId};
use saga_store::{SagaRecord, SagaStatus, SagaStore, Version};

use crate::compensator::{self, Reverse};
use crate::dispatcher::{Dispatch, Dispatcher, Phase, correlation_id};
use crate::saga::StepDetails;
use crate::{Action, Result, Saga, SagaCache, SagaError, SagaStatusEvent};

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline applied to sagas submitted without one.
    pub default_timeout: Duration,
    /// Re-reads attempted after an optimistic write conflict.
    pub max_conflict_retries: u32,
    /// Publish attempts for the terminal saga event.
    pub terminal_publish_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::seconds(300),
            max_conflict_retries: 3,
            terminal_publish_attempts: 3,
        }
    }
}

/// Outcome reported for a step by the owning service.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(StepDetails),
    Failure(String),
}

impl Outcome {
    pub fn success() -> Self {
        Outcome::Success(StepDetails::default())
    }
}

/// Saga orchestrator.
pub struct SagaEngine<S, P> {
    store: Arc<S>,
    cache: SagaCache,
    dispatcher: Dispatcher<P>,
    config: EngineConfig,
}

impl<S, P> SagaEngine<S, P>
where
    S: SagaStore,
    P: Publisher,
{
    pub fn new(store: Arc<S>, publisher: P) -> Self {
        Self {
            store,
            cache: SagaCache::new(),
            dispatcher: Dispatcher::new(publisher),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &SagaCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stores a new saga and dispatches its first step.
    #[tracing::instrument(skip(self, tenant, saga), fields(tenant_id = %tenant.id, transaction_id = %saga.transaction_id, saga_type = %saga.saga_type))]
    pub async fn put(&self, tenant: &Tenant, mut saga: Saga) -> Result<TransactionId> {
        let now = Utc::now();
        if saga.created_at == DateTime::<Utc>::default() {
            saga.created_at = now;
        }
        saga.updated_at = now;
        if saga.timeout_at <= now {
            saga.timeout_at = now + self.config.default_timeout;
        }
        saga.status = SagaStatus::Active;
        saga.version = Version::initial();
        saga.validate()?;

        let transaction_id = saga.transaction_id;
        let saga = match self.persist(tenant, saga).await {
            Ok(saga) => saga,
            Err(e) if e.is_version_conflict() => {
                return Err(SagaError::AlreadyExists(transaction_id));
            }
            Err(e) => return Err(e),
        };

        metrics::counter!("saga_created_total", "saga_type" => saga.saga_type.as_str())
            .increment(1);
        tracing::info!(
            steps = saga.steps.len(),
            initiated_by = %saga.initiated_by,
            "saga created"
        );

        self.drive(tenant, saga).await?;
        Ok(transaction_id)
    }

    /// Loads a saga, from the cache when present.
    pub async fn get(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<Option<Saga>> {
        if let Some(saga) = self.cache.get(tenant_id, transaction_id).await {
            return Ok(Some(saga));
        }
        self.load(tenant_id, transaction_id).await
    }

    /// Live sagas of one tenant.
    pub async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<Saga>> {
        self.store
            .get_all(tenant_id)
            .await?
            .iter()
            .map(Saga::from_record)
            .collect()
    }

    async fn load(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<Option<Saga>> {
        match self.store.get(tenant_id, transaction_id).await? {
            Some(record) => Ok(Some(Saga::from_record(&record)?)),
            None => Ok(None),
        }
    }

    /// Adopts a record read elsewhere (recovery, timeout claims) into the cache.
    pub async fn adopt(&self, record: &SagaRecord) -> Result<Saga> {
        let saga = Saga::from_record(record)?;
        self.cache.put(record.tenant.id, saga.clone()).await;
        Ok(saga)
    }

    /// Applies a status-event outcome to the step it answers.
    ///
    /// The event's correlation id must name the awaited step: the earliest
    /// pending step while Active, or the reverse of the step being rolled
    /// back while Compensating. `matches` then confirms the event reports
    /// that step's action. Events failing either check are duplicates or
    /// strays and are dropped. Returns true if the outcome was applied.
    #[tracing::instrument(
        skip(self, tenant, origin, matches, outcome),
        fields(tenant_id = %tenant.id, transaction_id = %origin.transaction_id)
    )]
    pub async fn step_completed<F>(
        &self,
        tenant: &Tenant,
        origin: Origin,
        matches: F,
        outcome: Outcome,
    ) -> Result<bool>
    where
        F: Fn(&Action) -> bool + Send + Sync,
    {
        let correlation = origin.correlation_id.as_deref();
        let updated = self
            .update(tenant, origin.transaction_id, |saga| {
                apply_outcome(saga, correlation, &matches, &outcome)
            })
            .await?;
        match updated {
            Some(saga) => {
                self.drive(tenant, saga).await?;
                Ok(true)
            }
            None => {
                tracing::debug!("status event matched no awaited step");
                Ok(false)
            }
        }
    }

    /// Re-evaluates a saga, dispatching whatever it is waiting for.
    pub async fn advance(&self, tenant: &Tenant, transaction_id: TransactionId) -> Result<()> {
        let Some(saga) = self.get(tenant.id, transaction_id).await? else {
            return Err(SagaError::NotFound(transaction_id));
        };
        if !saga.status.is_live() {
            tracing::debug!(%transaction_id, status = %saga.status, "saga already ended");
            return Ok(());
        }
        self.drive(tenant, saga).await
    }

    /// Fails a saga whose deadline passed. An Active saga fails its
    /// earliest pending step and compensates; a saga already compensating
    /// is ended.
    #[tracing::instrument(skip(self, tenant), fields(tenant_id = %tenant.id, transaction_id = %transaction_id))]
    pub async fn time_out(&self, tenant: &Tenant, transaction_id: TransactionId) -> Result<()> {
        let updated = self
            .update(tenant, transaction_id, |saga| match saga.status {
                SagaStatus::Active => match saga.earliest_pending() {
                    Some(index) => saga.fail_step(index, "timeout").map(Some),
                    None => Ok(None),
                },
                SagaStatus::Compensating => Ok(Some(saga.abandon())),
                _ => Ok(None),
            })
            .await?;
        if let Some(saga) = updated {
            metrics::counter!("saga_timeouts_total").increment(1);
            tracing::warn!("saga timed out");
            self.drive(tenant, saga).await?;
        }
        Ok(())
    }

    /// Writes `saga` with the version it was read at and caches the result.
    async fn persist(&self, tenant: &Tenant, mut saga: Saga) -> Result<Saga> {
        let record = saga.to_record(tenant)?;
        saga.version = self.store.put(&record).await?;
        self.cache.put(tenant.id, saga.clone()).await;
        Ok(saga)
    }

    /// Read-modify-write with conflict retries.
    ///
    /// `f` returns `None` when the saga needs no change. After a conflict
    /// the saga is re-read from the store and `f` is evaluated again; when
    /// the retries run out the update is abandoned and the next event is
    /// left to reconcile.
    async fn update<F>(
        &self,
        tenant: &Tenant,
        transaction_id: TransactionId,
        f: F,
    ) -> Result<Option<Saga>>
    where
        F: Fn(&Saga) -> Result<Option<Saga>> + Send + Sync,
    {
        let mut fresh = false;
        for attempt in 0..=self.config.max_conflict_retries {
            let current = if fresh {
                self.load(tenant.id, transaction_id).await?
            } else {
                self.get(tenant.id, transaction_id).await?
            };
            let Some(current) = current else {
                return Err(SagaError::NotFound(transaction_id));
            };
            let Some(next) = f(&current)? else {
                return Ok(None);
            };

            match self.persist(tenant, next).await {
                Ok(saga) => return Ok(Some(saga)),
                Err(e) if e.is_version_conflict() => {
                    metrics::counter!("saga_version_conflicts_total").increment(1);
                    tracing::debug!(attempt, "version conflict, re-reading saga");
                    fresh = true;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            %transaction_id,
            retries = self.config.max_conflict_retries,
            "abandoning saga update after repeated version conflicts"
        );
        Ok(None)
    }

    /// Runs side effects for the current state until the saga waits on an
    /// external event or ends.
    async fn drive(&self, tenant: &Tenant, mut saga: Saga) -> Result<()> {
        let transaction_id = saga.transaction_id;
        loop {
            let next = match saga.status {
                SagaStatus::Active => {
                    let Some(index) = saga.earliest_pending() else {
                        return Ok(());
                    };
                    let step_id = saga.steps[index].step_id.clone();
                    let action = saga.steps[index].action.clone();
                    let origin = Origin::new(
                        transaction_id,
                        Some(correlation_id(&step_id, Phase::Forward)),
                    );
                    match self.dispatcher.dispatch(tenant, &origin, &action).await {
                        Ok(Dispatch::Awaiting) => return Ok(()),
                        Ok(Dispatch::Completed) => {
                            self.update(tenant, transaction_id, |s| {
                                if awaiting(s, index, &step_id) {
                                    s.complete_step(index, StepDetails::default()).map(Some)
                                } else {
                                    Ok(None)
                                }
                            })
                            .await?
                        }
                        Err(e) => {
                            tracing::warn!(%step_id, action = action.name(), error = %e, "step dispatch failed");
                            let reason = e.to_string();
                            self.update(tenant, transaction_id, |s| {
                                if awaiting(s, index, &step_id) {
                                    s.fail_step(index, reason.clone()).map(Some)
                                } else {
                                    Ok(None)
                                }
                            })
                            .await?
                        }
                    }
                }
                SagaStatus::Compensating => self.compensate(tenant, &saga).await?,
                SagaStatus::Completed | SagaStatus::Failed => {
                    return self.finish(tenant, &saga).await;
                }
            };

            match next {
                Some(updated) => saga = updated,
                None => return Ok(()),
            }
        }
    }

    /// One compensation move. Returns the updated saga, or `None` while a
    /// reverse action is in flight.
    async fn compensate(&self, tenant: &Tenant, saga: &Saga) -> Result<Option<Saga>> {
        let transaction_id = saga.transaction_id;
        let Some(index) = saga.failed_index() else {
            return Ok(None);
        };
        let step_id = saga.steps[index].step_id.clone();
        let still_failed =
            move |s: &Saga| s.status == SagaStatus::Compensating && s.failed_index() == Some(index);

        if saga.is_original_failure(index) {
            if matches!(saga.steps[index].action, Action::ValidateCharacterState(_)) {
                tracing::info!(%step_id, "character state check failed, ending saga without compensation");
                return self
                    .update(tenant, transaction_id, |s| {
                        Ok(still_failed(s).then(|| s.abandon()))
                    })
                    .await;
            }
            return self
                .update(tenant, transaction_id, |s| {
                    if still_failed(s) {
                        s.compensate_step(index).map(Some)
                    } else {
                        Ok(None)
                    }
                })
                .await;
        }

        let compensated = |s: &Saga| {
            if still_failed(s) {
                s.compensate_step(index).map(Some)
            } else {
                Ok(None)
            }
        };
        match compensator::reverse(saga, index) {
            Reverse::NoOp => self.update(tenant, transaction_id, compensated).await,
            Reverse::Dispatch(action) => {
                metrics::counter!("saga_compensations_total", "action" => action.name())
                    .increment(1);
                tracing::info!(%step_id, reverse = action.name(), "compensating step");
                let origin =
                    Origin::new(transaction_id, Some(correlation_id(&step_id, Phase::Reverse)));
                match self.dispatcher.dispatch(tenant, &origin, &action).await {
                    Ok(Dispatch::Awaiting) => Ok(None),
                    Ok(Dispatch::Completed) => {
                        self.update(tenant, transaction_id, compensated).await
                    }
                    Err(e) => {
                        tracing::error!(
                            %step_id,
                            reverse = action.name(),
                            error = %e,
                            "compensation dispatch failed, saga needs operator intervention"
                        );
                        self.update(tenant, transaction_id, |s| {
                            Ok(still_failed(s).then(|| s.abandon()))
                        })
                        .await
                    }
                }
            }
        }
    }

    /// Emits the terminal event and retires the saga.
    ///
    /// The saga is marked terminal and evicted from the cache whether or
    /// not the event could be published; a publish that keeps failing is
    /// reported after retirement.
    async fn finish(&self, tenant: &Tenant, saga: &Saga) -> Result<()> {
        let transaction_id = saga.transaction_id;
        let completed = saga.status == SagaStatus::Completed;
        let event = if completed {
            SagaStatusEvent::completed(saga)
        } else {
            SagaStatusEvent::failed(saga)
        };

        let published = self.publish_terminal(tenant, &event).await;

        let marked = if completed {
            self.store.mark_completed(tenant.id, transaction_id).await
        } else {
            self.store.mark_failed(tenant.id, transaction_id).await
        };
        self.cache.remove(tenant.id, transaction_id).await;
        published?;
        marked?;

        let elapsed = (Utc::now() - saga.created_at).num_milliseconds().max(0) as f64 / 1000.0;
        metrics::histogram!("saga_duration_seconds").record(elapsed);
        if completed {
            metrics::counter!("saga_completed_total", "saga_type" => saga.saga_type.as_str())
                .increment(1);
            tracing::info!(%transaction_id, "saga completed");
        } else {
            metrics::counter!("saga_failed_total", "saga_type" => saga.saga_type.as_str())
                .increment(1);
            tracing::info!(
                %transaction_id,
                failed_step = saga.failure.as_ref().map(|f| f.step_id.as_str()),
                "saga failed"
            );
        }
        Ok(())
    }
}

impl<S, P> SagaEngine<S, P>
where
    P: Publisher,
{
    /// Publishes the terminal event, retrying with a short backoff.
    async fn publish_terminal(&self, tenant: &Tenant, event: &SagaStatusEvent) -> Result<()> {
        let attempts = self.config.terminal_publish_attempts.max(1);
        let mut attempt = 1;
        loop {
            let mut buffer = Buffer::new();
            buffer.put(Topic::EventSagaStatus, event.transaction_id, tenant, event)?;
            match buffer.emit(self.dispatcher.publisher()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        transaction_id = %event.transaction_id,
                        attempt,
                        error = %e,
                        "terminal saga event publish failed, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(10 * u64::from(attempt)))
                        .await;
                    attempt += 1;
                }
                Err(e) => {
                    metrics::counter!("saga_terminal_publish_failures_total").increment(1);
                    tracing::error!(
                        transaction_id = %event.transaction_id,
                        error = %e,
                        "terminal saga event lost after repeated publish failures"
                    );
                    return Err(e.into());
                }
            }
        }
    }
}

/// True while the step at `index` is still the one the saga waits on.
fn awaiting(saga: &Saga, index: usize, step_id: &str) -> bool {
    saga.status == SagaStatus::Active
        && saga.earliest_pending() == Some(index)
        && saga.steps[index].step_id == step_id
}

/// True when `correlation` names the given half of the step at `index`.
fn correlates(saga: &Saga, index: usize, phase: Phase, correlation: Option<&str>) -> bool {
    let expected = correlation_id(&saga.steps[index].step_id, phase);
    if correlation == Some(expected.as_str()) {
        return true;
    }
    tracing::debug!(
        awaited = %expected,
        received = correlation.unwrap_or("<none>"),
        "status event answers another step"
    );
    false
}

fn apply_outcome<F>(
    saga: &Saga,
    correlation: Option<&str>,
    matches: &F,
    outcome: &Outcome,
) -> Result<Option<Saga>>
where
    F: Fn(&Action) -> bool,
{
    match saga.status {
        SagaStatus::Active => {
            let Some(index) = saga.earliest_pending() else {
                return Ok(None);
            };
            if !correlates(saga, index, Phase::Forward, correlation)
                || !matches(&saga.steps[index].action)
            {
                return Ok(None);
            }
            match outcome {
                Outcome::Success(details) => saga.complete_step(index, *details).map(Some),
                Outcome::Failure(reason) => {
                    tracing::info!(
                        step_id = %saga.steps[index].step_id,
                        %reason,
                        "step failed"
                    );
                    saga.fail_step(index, reason.clone()).map(Some)
                }
            }
        }
        SagaStatus::Compensating => {
            let Some(index) = saga.failed_index() else {
                return Ok(None);
            };
            if saga.is_original_failure(index) {
                return Ok(None);
            }
            let Reverse::Dispatch(reverse) = compensator::reverse(saga, index) else {
                return Ok(None);
            };
            if !correlates(saga, index, Phase::Reverse, correlation) || !matches(&reverse) {
                return Ok(None);
            }
            match outcome {
                Outcome::Success(_) => saga.compensate_step(index).map(Some),
                Outcome::Failure(reason) => {
                    tracing::error!(
                        step_id = %saga.steps[index].step_id,
                        %reason,
                        "compensation failed, saga needs operator intervention"
                    );
                    Ok(Some(saga.abandon()))
                }
            }
        }
        SagaStatus::Completed | SagaStatus::Failed => Ok(None),
    }
}
