//! Read-only saga inspection.

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use bus::Publisher;
use common::{TenantId, TransactionId};
use saga::{Saga, SagaEngine};
use saga_store::SagaStore;

use crate::error::ApiError;

/// Header naming the tenant a request is scoped to.
pub const TENANT_ID_HEADER: &str = "TENANT_ID";

/// Shared state for the saga routes.
pub struct AppState<S, P> {
    pub engine: Arc<SagaEngine<S, P>>,
}

/// Tenant taken from the `TENANT_ID` request header.
#[derive(Debug, Clone, Copy)]
pub struct TenantHeader(pub TenantId);

impl<T: Send + Sync> FromRequestParts<T> for TenantHeader {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &T) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("missing {TENANT_ID_HEADER} header")))?;
        let tenant_id = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {TENANT_ID_HEADER} header")))?;
        Ok(TenantHeader(tenant_id))
    }
}

/// GET /sagas
#[tracing::instrument(skip_all, fields(tenant_id = %tenant_id))]
pub async fn list<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    TenantHeader(tenant_id): TenantHeader,
) -> Result<Json<Vec<Saga>>, ApiError>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    Ok(Json(state.engine.get_all(tenant_id).await?))
}

/// GET /sagas/{transaction_id}
#[tracing::instrument(skip_all, fields(tenant_id = %tenant_id, transaction_id = %id))]
pub async fn get<S, P>(
    State(state): State<Arc<AppState<S, P>>>,
    TenantHeader(tenant_id): TenantHeader,
    Path(id): Path<String>,
) -> Result<Json<Saga>, ApiError>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    let transaction_id: TransactionId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid transaction id: {e}")))?;
    state
        .engine
        .get(tenant_id, transaction_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Saga not found: {transaction_id}")))
}
