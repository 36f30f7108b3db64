use common::{Tenant, TenantId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, Topic};

/// Headers propagated with every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headers {
    pub tenant_id: TenantId,
    pub region: String,
    pub major_version: u16,
    pub minor_version: u16,
    /// Trace id shared by every message caused by the same external request.
    pub trace_id: String,
}

impl Headers {
    /// Headers for a message that starts a new trace.
    pub fn new(tenant: &Tenant) -> Self {
        Self {
            tenant_id: tenant.id,
            region: tenant.region.clone(),
            major_version: tenant.major_version,
            minor_version: tenant.minor_version,
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Rebuilds the tenant context carried by these headers.
    pub fn tenant(&self) -> Tenant {
        Tenant::new(
            self.tenant_id,
            self.region.clone(),
            self.major_version,
            self.minor_version,
        )
    }
}

/// A keyed message on a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    /// Partition key; the natural key of the entity the message concerns.
    pub key: String,
    pub headers: Headers,
    pub value: serde_json::Value,
}

impl Message {
    /// Encodes `body` as the value of a message for `tenant`.
    pub fn new<T: Serialize>(
        topic: Topic,
        key: impl ToString,
        tenant: &Tenant,
        body: &T,
    ) -> Result<Self> {
        Ok(Self {
            topic: topic.name(),
            key: key.to_string(),
            headers: Headers::new(tenant),
            value: serde_json::to_value(body)?,
        })
    }

    /// Continues the trace of `parent` instead of starting a new one.
    pub fn caused_by(mut self, parent: &Headers) -> Self {
        self.headers.trace_id = parent.trace_id.clone();
        self
    }

    /// Decodes the message value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }

    pub fn tenant(&self) -> Tenant {
        self.headers.tenant()
    }
}
