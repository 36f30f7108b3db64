//! Redis-backed drop registry shared by every orchestrator instance.
//!
//! Layout:
//! - `drops:next_id` holds the last allocated id (global across tenants)
//! - `drop:{tenant}:{id}` holds the JSON record
//! - `map:{tenant}:{world}:{channel}:{map}:{instance}` is the set of drop ids on a map
//! - `drops:all` is the set of record keys, walked by expiration
//!
//! Records change through a compare-and-set script so concurrent
//! reservations serialize. Index sets are written with a plain pipeline and
//! may briefly disagree with the records; readers skip dangling members.

use std::sync::Arc;

use async_trait::async_trait;
use common::{CharacterId, Field, Tenant, TenantId};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};

use crate::{Drop, DropBuilder, DropError, DropRegistry, DropStatus, IdRange, Result};

const NEXT_ID_KEY: &str = "drops:next_id";
const ALL_DROPS_KEY: &str = "drops:all";
const MAX_CAS_ATTEMPTS: usize = 5;

/// INCR with wrap-around. ARGV[1] is the range minimum, ARGV[2] the maximum.
const ALLOCATE_ID_SCRIPT: &str = r#"
local next = redis.call('INCR', KEYS[1])
local min = tonumber(ARGV[1])
local max = tonumber(ARGV[2])
if next < min or next > max then
    redis.call('SET', KEYS[1], min)
    return min
end
return next
"#;

/// Replaces KEYS[1] with ARGV[2] only if it still holds ARGV[1].
const COMPARE_AND_SET_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDrop {
    tenant: Tenant,
    drop: Drop,
}

fn drop_key(tenant_id: TenantId, drop_id: u32) -> String {
    format!("drop:{tenant_id}:{drop_id}")
}

fn map_key(tenant_id: TenantId, field: &Field) -> String {
    format!(
        "map:{tenant_id}:{}:{}:{}:{}",
        field.world_id, field.channel_id, field.map_id, field.instance
    )
}

/// Drop registry stored in Redis.
#[derive(Clone)]
pub struct RedisDropRegistry {
    conn: MultiplexedConnection,
    range: IdRange,
    allocate_id: Arc<redis::Script>,
    compare_and_set: Arc<redis::Script>,
}

impl RedisDropRegistry {
    /// Connects and seeds the id counter if it does not exist yet.
    pub async fn connect(client: &redis::Client, range: IdRange) -> Result<Self> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let seeded: bool = conn.set_nx(NEXT_ID_KEY, range.min - 1).await?;
        if seeded {
            tracing::info!(min = range.min, max = range.max, "seeded drop id counter");
        }
        Ok(Self {
            conn,
            range,
            allocate_id: Arc::new(redis::Script::new(ALLOCATE_ID_SCRIPT)),
            compare_and_set: Arc::new(redis::Script::new(COMPARE_AND_SET_SCRIPT)),
        })
    }

    async fn next_id(&self) -> Result<u32> {
        let mut conn = self.conn.clone();
        let id: u32 = self
            .allocate_id
            .key(NEXT_ID_KEY)
            .arg(self.range.min)
            .arg(self.range.max)
            .invoke_async(&mut conn)
            .await?;
        Ok(id)
    }

    async fn load(&self, key: &str) -> Result<Option<(String, StoredDrop)>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => {
                let stored = serde_json::from_str(&raw)?;
                Ok(Some((raw, stored)))
            }
            None => Ok(None),
        }
    }

    async fn swap(&self, key: &str, expected: &str, replacement: &StoredDrop) -> Result<bool> {
        let mut conn = self.conn.clone();
        let replaced: i32 = self
            .compare_and_set
            .key(key)
            .arg(expected)
            .arg(serde_json::to_string(replacement)?)
            .invoke_async(&mut conn)
            .await?;
        Ok(replaced == 1)
    }

    async fn load_many(&self, keys: Vec<String>) -> Result<Vec<StoredDrop>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let raws: Vec<Option<String>> = conn.mget(&keys).await?;
        let mut drops = Vec::with_capacity(raws.len());
        for raw in raws.into_iter().flatten() {
            drops.push(serde_json::from_str(&raw)?);
        }
        Ok(drops)
    }
}

#[async_trait]
impl DropRegistry for RedisDropRegistry {
    #[tracing::instrument(skip(self, tenant, builder), fields(tenant_id = %tenant.id))]
    async fn create_drop(&self, tenant: &Tenant, builder: DropBuilder) -> Result<Drop> {
        builder.validate()?;
        let id = self.next_id().await?;
        let drop = builder.build(id)?;
        let key = drop_key(tenant.id, id);
        let stored = StoredDrop {
            tenant: tenant.clone(),
            drop: drop.clone(),
        };

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .set(&key, serde_json::to_string(&stored)?)
            .ignore()
            .sadd(map_key(tenant.id, drop.field()), id)
            .ignore()
            .sadd(ALL_DROPS_KEY, &key)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(drop)
    }

    async fn get_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Drop> {
        self.load(&drop_key(tenant_id, drop_id))
            .await?
            .map(|(_, stored)| stored.drop)
            .ok_or(DropError::NotFound(drop_id))
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_drop(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
        pet_slot: i8,
    ) -> Result<Drop> {
        let key = drop_key(tenant_id, drop_id);
        for _ in 0..MAX_CAS_ATTEMPTS {
            let (raw, stored) = self
                .load(&key)
                .await?
                .ok_or(DropError::NotFound(drop_id))?;

            match (stored.drop.status(), stored.drop.reserved_by()) {
                (DropStatus::Reserved, Some(holder)) if holder == character_id => {
                    return Ok(stored.drop);
                }
                (DropStatus::Reserved, holder) => {
                    return Err(DropError::ReservedByAnother {
                        drop_id,
                        reserved_by: holder.unwrap_or_default(),
                    });
                }
                (DropStatus::Available, _) => {}
            }

            let reserved = StoredDrop {
                drop: stored.drop.reserve(character_id, pet_slot),
                tenant: stored.tenant,
            };
            if self.swap(&key, &raw, &reserved).await? {
                return Ok(reserved.drop);
            }
            tracing::debug!(drop_id, "reservation lost a compare-and-set race, retrying");
        }
        Err(DropError::Contended(drop_id))
    }

    async fn cancel_drop_reservation(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Result<()> {
        let key = drop_key(tenant_id, drop_id);
        for _ in 0..MAX_CAS_ATTEMPTS {
            let Some((raw, stored)) = self.load(&key).await? else {
                return Ok(());
            };
            if !stored.drop.is_reserved_by(character_id) {
                return Ok(());
            }
            let released = StoredDrop {
                drop: stored.drop.cancel_reservation(),
                tenant: stored.tenant,
            };
            if self.swap(&key, &raw, &released).await? {
                return Ok(());
            }
        }
        Err(DropError::Contended(drop_id))
    }

    async fn remove_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Option<Drop>> {
        let key = drop_key(tenant_id, drop_id);
        let mut conn = self.conn.clone();
        // GETDEL makes removal exactly-once between gather and expiration
        let raw: Option<String> = redis::cmd("GETDEL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let stored: StoredDrop = serde_json::from_str(&raw)?;

        let _: () = redis::pipe()
            .srem(map_key(tenant_id, stored.drop.field()), drop_id)
            .ignore()
            .srem(ALL_DROPS_KEY, &key)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(Some(stored.drop))
    }

    async fn get_drops_for_map(&self, tenant_id: TenantId, field: &Field) -> Result<Vec<Drop>> {
        let mut conn = self.conn.clone();
        let ids: Vec<u32> = conn.smembers(map_key(tenant_id, field)).await?;
        let keys = ids.into_iter().map(|id| drop_key(tenant_id, id)).collect();
        let mut drops: Vec<Drop> = self
            .load_many(keys)
            .await?
            .into_iter()
            .map(|stored| stored.drop)
            .collect();
        drops.sort_by_key(Drop::id);
        Ok(drops)
    }

    async fn get_all_drops(&self) -> Result<Vec<(Tenant, Drop)>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.smembers(ALL_DROPS_KEY).await?;
        Ok(self
            .load_many(keys)
            .await?
            .into_iter()
            .map(|stored| (stored.tenant, stored.drop))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_tenant_prefixed() {
        let tenant_id = TenantId::new();
        let field = Field::new(1, 2, 100000000);
        assert_eq!(drop_key(tenant_id, 7), format!("drop:{tenant_id}:7"));
        assert_eq!(
            map_key(tenant_id, &field),
            format!("map:{tenant_id}:1:2:100000000:{}", uuid_nil())
        );
    }

    fn uuid_nil() -> String {
        "00000000-0000-0000-0000-000000000000".to_string()
    }
}
