//! Tenant context.
//!
//! Every registry key, store row and bus message is scoped by a tenant. The
//! full [`Tenant`] (region and client version) travels in message headers;
//! most lookups only need the [`TenantId`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Creates a new random tenant ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a tenant ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for TenantId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A tenant: isolation scope plus the game region and client version it serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub region: String,
    pub major_version: u16,
    pub minor_version: u16,
}

impl Tenant {
    pub fn new(id: TenantId, region: impl Into<String>, major_version: u16, minor_version: u16) -> Self {
        Self {
            id,
            region: region.into(),
            major_version,
            minor_version,
        }
    }

    pub fn id(&self) -> TenantId {
        self.id
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{} v{}.{}]",
            self.id, self.region, self.major_version, self.minor_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_display_includes_region_and_version() {
        let id = TenantId::new();
        let tenant = Tenant::new(id, "GMS", 83, 1);
        assert_eq!(tenant.to_string(), format!("{id} [GMS v83.1]"));
    }

    #[test]
    fn tenant_serializes_with_camel_case_fields() {
        let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
        let json = serde_json::to_value(&tenant).unwrap();
        assert_eq!(json["majorVersion"], 83);
        assert_eq!(json["minorVersion"], 1);
        let back: Tenant = serde_json::from_value(json).unwrap();
        assert_eq!(back, tenant);
    }
}
