//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p inventory --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use bus::InMemoryBus;
use common::{EquipmentStats, InventoryType, Tenant, TenantId, TransactionId};
use inventory::{
    Asset, AssetReference, Change, CompartmentKey, InventoryEngine, InventoryRepository,
    LockRegistry, PostgresInventoryRepository, ReservationRegistry, StaticItemData,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/002_create_inventory_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh repository with its own pool and cleared tables
async fn get_test_repository() -> PostgresInventoryRepository {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE assets, asset_references, compartments")
        .execute(&pool)
        .await
        .unwrap();

    PostgresInventoryRepository::new(pool)
}

fn tenant() -> Tenant {
    Tenant::new(TenantId::new(), "GMS", 83, 1)
}

fn asset(id: u32, slot: i16, template_id: u32, quantity: u32) -> Asset {
    Asset {
        id,
        slot,
        template_id,
        quantity,
        expiration: None,
        reference_id: id,
    }
}

#[tokio::test]
#[serial]
async fn unknown_compartment_loads_empty_with_default_capacity() {
    let repository = get_test_repository().await;
    let key = CompartmentKey::storage(77);

    let tenant_id = TenantId::new();

    let compartment = repository.load(tenant_id, key).await.unwrap();
    assert!(compartment.is_empty());
    assert_eq!(compartment.capacity, 4);

    repository.set_capacity(tenant_id, key, 16).await.unwrap();
    assert_eq!(repository.load(tenant_id, key).await.unwrap().capacity, 16);
}

#[tokio::test]
#[serial]
async fn commit_persists_assets_and_references() {
    let repository = get_test_repository().await;
    let tenant_id = TenantId::new();
    let key = CompartmentKey::character(1, InventoryType::Equip);
    let stats = EquipmentStats {
        weapon_attack: 17,
        ..EquipmentStats::default()
    };

    repository
        .commit(
            tenant_id,
            vec![
                Change::PutReference(AssetReference {
                    id: 10,
                    template_id: 1302000,
                    stats: Some(stats),
                    reference_count: 1,
                }),
                Change::PutAsset {
                    key,
                    asset: asset(10, -11, 1302000, 1),
                },
            ],
        )
        .await
        .unwrap();

    let compartment = repository.load(tenant_id, key).await.unwrap();
    assert_eq!(compartment.asset_at(-11), Some(&asset(10, -11, 1302000, 1)));
    let reference = repository.reference(tenant_id, 10).await.unwrap().unwrap();
    assert_eq!(reference.stats, Some(stats));

    let other_tenant = repository.load(TenantId::new(), key).await.unwrap();
    assert!(other_tenant.is_empty());
}

#[tokio::test]
#[serial]
async fn swap_inside_one_commit_passes_the_deferred_slot_check() {
    let repository = get_test_repository().await;
    let tenant_id = TenantId::new();
    let key = CompartmentKey::character(1, InventoryType::Etc);
    repository
        .commit(
            tenant_id,
            vec![
                Change::PutAsset { key, asset: asset(1, 1, 4000000, 5) },
                Change::PutAsset { key, asset: asset(2, 2, 4000001, 5) },
            ],
        )
        .await
        .unwrap();

    repository
        .commit(
            tenant_id,
            vec![
                Change::PutAsset { key, asset: asset(1, 2, 4000000, 5) },
                Change::PutAsset { key, asset: asset(2, 1, 4000001, 5) },
            ],
        )
        .await
        .unwrap();

    let layout = repository.load(tenant_id, key).await.unwrap().layout();
    assert_eq!(layout.get(&1), Some(&4000001));
    assert_eq!(layout.get(&2), Some(&4000000));
}

#[tokio::test]
#[serial]
async fn failed_commit_leaves_nothing_behind() {
    let repository = get_test_repository().await;
    let tenant_id = TenantId::new();
    let key = CompartmentKey::character(1, InventoryType::Etc);

    let result = repository
        .commit(
            tenant_id,
            vec![
                Change::PutAsset { key, asset: asset(1, 1, 4000000, 5) },
                Change::PutAsset { key, asset: asset(2, 1, 4000001, 5) },
            ],
        )
        .await;

    assert!(result.is_err());
    assert!(repository.load(tenant_id, key).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn engine_transfers_between_character_and_storage() {
    let repository = Arc::new(get_test_repository().await);
    let engine = InventoryEngine::new(
        repository.clone(),
        InMemoryBus::new(),
        Arc::new(StaticItemData::new()),
        LockRegistry::new(),
        ReservationRegistry::new(),
    );
    let tenant = tenant();
    let created = engine
        .create_asset(&tenant, TransactionId::new(), 5, InventoryType::Equip, 1302000, 1, None)
        .await
        .unwrap();
    let sword = created[0].clone();

    let stored = engine
        .accept(&tenant, TransactionId::new(), CompartmentKey::storage(900), sword.reference_id, 1)
        .await
        .unwrap();
    engine
        .release(
            &tenant,
            TransactionId::new(),
            CompartmentKey::character(5, InventoryType::Equip),
            sword.id,
        )
        .await
        .unwrap();

    let storage = engine
        .get_compartment(&tenant, CompartmentKey::storage(900))
        .await
        .unwrap();
    assert_eq!(storage.asset_at(stored.slot).unwrap().reference_id, sword.reference_id);
    let reference = engine.get_reference(&tenant, sword.reference_id).await.unwrap();
    assert_eq!(reference.reference_count, 1);
}
