use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use models::{Tier, TierCatalog, TierSpec, TierUpdate};
use service::storage::{
    ConfigObject, ConfigObjectApi, JsonFileConfigObjects, MemoryConfigObjects, ObjectKey, Revision,
};
use service::{CatalogStore, RetryPolicy, ServiceError, TierService};

const NAMESPACE: &str = "test";
const NAME: &str = "tier-to-group-mapping";

/// Wraps the memory backend: counts reads and, while `races` is positive,
/// lets a rival writer sneak in a change right before each of our writes.
struct RacingObjects {
    inner: Arc<MemoryConfigObjects>,
    races: AtomicU32,
    reads: AtomicUsize,
    rivals: AtomicU32,
}

impl RacingObjects {
    fn new(races: u32) -> Self {
        Self {
            inner: Arc::new(MemoryConfigObjects::new()),
            races: AtomicU32::new(races),
            reads: AtomicUsize::new(0),
            rivals: AtomicU32::new(0),
        }
    }

    async fn rival_write(&self, key: &ObjectKey) {
        if self.races.load(Ordering::SeqCst) == 0 {
            return;
        }
        self.races.fetch_sub(1, Ordering::SeqCst);
        let n = self.rivals.fetch_add(1, Ordering::SeqCst);
        let mut data = match self.inner.get(key).await {
            Ok(Some(obj)) => obj.data,
            _ => BTreeMap::new(),
        };
        let doc = data.get("tiers").map(String::as_str).unwrap_or("");
        let mut catalog = TierCatalog::from_document(doc).unwrap();
        catalog
            .insert(Tier {
                name: format!("rival-{n}"),
                description: String::new(),
                level: 0,
                groups: vec![],
            })
            .unwrap();
        data.insert("tiers".into(), catalog.to_document().unwrap());
        self.inner.force_put(key, data).await;
    }
}

#[async_trait]
impl ConfigObjectApi for RacingObjects {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ConfigObject>, ServiceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn create(
        &self,
        key: &ObjectKey,
        data: BTreeMap<String, String>,
    ) -> Result<Revision, ServiceError> {
        self.rival_write(key).await;
        self.inner.create(key, data).await
    }

    async fn patch_entry(
        &self,
        key: &ObjectKey,
        expected: &Revision,
        entry: &str,
        value: String,
    ) -> Result<Revision, ServiceError> {
        self.rival_write(key).await;
        self.inner.patch_entry(key, expected, entry, value).await
    }
}

fn memory_service() -> (Arc<MemoryConfigObjects>, TierService<MemoryConfigObjects>) {
    let api = Arc::new(MemoryConfigObjects::new());
    let svc = TierService::new(CatalogStore::new(api.clone(), NAMESPACE, NAME));
    (api, svc)
}

fn racing_service(races: u32, attempts: u32) -> (Arc<RacingObjects>, TierService<RacingObjects>) {
    let api = Arc::new(RacingObjects::new(races));
    let svc = TierService::new(CatalogStore::new(api.clone(), NAMESPACE, NAME))
        .with_retry(RetryPolicy::new(attempts, Duration::ZERO, Duration::ZERO));
    (api, svc)
}

fn names(tiers: &[Tier]) -> Vec<&str> {
    tiers.iter().map(|t| t.name.as_str()).collect()
}

#[tokio::test]
async fn create_without_groups_stores_empty_sequence() -> anyhow::Result<()> {
    let (api, svc) = memory_service();
    let created = svc.create_tier(TierSpec::new("stored-tier", "Tier to verify storage", 2)).await?;
    assert_eq!(created.name, "stored-tier");
    assert_eq!(created.description, "Tier to verify storage");
    assert_eq!(created.level, 2);
    assert!(created.groups.is_empty());

    let snapshot = svc.store().load().await?;
    assert_eq!(snapshot.catalog.len(), 1);
    assert!(snapshot.catalog.tiers[0].groups.is_empty());

    let raw = api.get(&ObjectKey::new(NAMESPACE, NAME)).await?.expect("object created");
    assert!(raw.data["tiers"].contains("groups: []"), "stored document: {}", raw.data["tiers"]);
    Ok(())
}

#[tokio::test]
async fn explicit_empty_groups_behave_like_omission() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    let omitted = svc.create_tier(TierSpec::new("a", "d", 1)).await?;
    let empty = svc
        .create_tier(TierSpec::new("b", "d", 1).with_groups(Vec::<String>::new()))
        .await?;
    assert_eq!(omitted.groups, empty.groups);
    assert_eq!(svc.get_tier("b").await?.groups, Vec::<String>::new());
    Ok(())
}

#[tokio::test]
async fn create_with_groups_keeps_given_order() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    let spec = TierSpec::new("test-tier-with-groups", "Test tier with groups", 1)
        .with_groups(["system:authenticated", "premium-users"]);
    let created = svc.create_tier(spec).await?;
    assert_eq!(created.groups, ["system:authenticated", "premium-users"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_create_fails_and_keeps_existing() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    svc.create_tier(TierSpec::new("premium", "Premium tier", 3).with_groups(["premium-users"]))
        .await?;
    let err = svc
        .create_tier(TierSpec::new("premium", "Impostor", 9))
        .await
        .expect_err("duplicate create must fail");
    assert!(matches!(err, ServiceError::AlreadyExists(_)));

    let kept = svc.get_tier("premium").await?;
    assert_eq!(kept.description, "Premium tier");
    assert_eq!(kept.level, 3);
    assert_eq!(kept.groups, ["premium-users"]);
    assert_eq!(svc.get_tiers().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_create_input_is_rejected_before_storage() -> anyhow::Result<()> {
    let (api, svc) = racing_service(0, 3);
    let err = svc
        .create_tier(TierSpec::new("premium", "", 3).with_groups(["Premium-Users"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidGroup(_)));
    assert!(err.is_bad_request());
    let err = svc.create_tier(TierSpec::new("", "", 3)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(api.reads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn tier_names_are_case_sensitive() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    svc.create_tier(TierSpec::new("Premium", "Upper", 3)).await?;
    svc.create_tier(TierSpec::new("premium", "Lower", 2)).await?;
    assert_eq!(names(&svc.get_tiers().await?), ["Premium", "premium"]);
    assert_eq!(svc.get_tier("Premium").await?.description, "Upper");
    assert_eq!(svc.get_tier("premium").await?.description, "Lower");
    assert!(matches!(svc.get_tier("PREMIUM").await, Err(ServiceError::NotFound(_))));

    let err = svc.create_tier(TierSpec::new("Premium", "again", 1)).await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));
    Ok(())
}

#[tokio::test]
async fn add_group_twice_is_the_same_as_once() -> anyhow::Result<()> {
    let (api, svc) = memory_service();
    svc.create_tier(TierSpec::new("premium", "", 3)).await?;
    let once = svc.add_group("premium", "vip-users").await?;
    let writes = api.generation().await;
    let twice = svc.add_group("premium", "vip-users").await?;
    assert_eq!(once.groups, ["vip-users"]);
    assert_eq!(twice.groups, once.groups);
    assert_eq!(api.generation().await, writes, "no-op add must not write");

    let err = svc.add_group("premium", "VIP").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidGroup(_)));
    let err = svc.add_group("gold", "vip-users").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn remove_absent_group_is_a_no_op() -> anyhow::Result<()> {
    let (api, svc) = memory_service();
    svc.create_tier(TierSpec::new("premium", "", 3).with_groups(["premium-users", "vip-users"]))
        .await?;
    let before = svc.store().load().await?;

    let tier = svc.remove_group("premium", "nobody").await?;
    assert_eq!(tier.groups, ["premium-users", "vip-users"]);
    let after = svc.store().load().await?;
    assert_eq!(after, before);

    let tier = svc.remove_group("premium", "premium-users").await?;
    assert_eq!(tier.groups, ["vip-users"]);
    assert!(api.generation().await > 1);

    let err = svc.remove_group("gold", "vip-users").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn tiers_by_group_follow_catalog_order() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    svc.create_tier(TierSpec::new("premium", "Premium tier", 3).with_groups(["premium-users"]))
        .await?;
    svc.create_tier(
        TierSpec::new("enterprise", "Enterprise tier", 4)
            .with_groups(["premium-users", "enterprise-users"]),
    )
    .await?;

    assert_eq!(names(&svc.get_tiers_by_group("premium-users").await?), ["premium", "enterprise"]);
    assert_eq!(names(&svc.get_tiers_by_group("enterprise-users").await?), ["enterprise"]);
    assert!(svc.get_tiers_by_group("nonexistent-group").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn tiers_by_group_on_missing_object_is_empty() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    assert!(svc.get_tiers_by_group("system:authenticated").await?.is_empty());
    assert!(svc.get_tiers().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_group_query_never_touches_storage() -> anyhow::Result<()> {
    let (api, svc) = racing_service(0, 3);
    let err = svc.get_tiers_by_group("InvalidGroup").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidGroup(_)));
    assert!(err.is_bad_request());
    assert_eq!(api.reads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn update_replaces_fields_and_keeps_name() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    svc.create_tier(TierSpec::new("free", "Free", 1).with_groups(["system:authenticated"])).await?;
    svc.create_tier(TierSpec::new("premium", "Premium", 3)).await?;

    let updated = svc
        .update_tier(
            "free",
            TierUpdate::new("Free for everyone", 0).with_groups(["system:authenticated", "guests"]),
        )
        .await?;
    assert_eq!(updated.name, "free");
    assert_eq!(updated.level, 0);
    assert_eq!(updated.groups, ["system:authenticated", "guests"]);

    // groups omitted on update means none
    let cleared = svc.update_tier("free", TierUpdate::new("Free", 1)).await?;
    assert!(cleared.groups.is_empty());

    // order is untouched by updates
    assert_eq!(names(&svc.get_tiers().await?), ["free", "premium"]);

    let err = svc.update_tier("gold", TierUpdate::new("", 1)).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = svc
        .update_tier("free", TierUpdate::new("", 1).with_groups(["Bad"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidGroup(_)));
    Ok(())
}

#[tokio::test]
async fn delete_removes_and_reports_missing() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    svc.create_tier(TierSpec::new("a", "", 1)).await?;
    svc.create_tier(TierSpec::new("b", "", 2)).await?;
    svc.create_tier(TierSpec::new("c", "", 3)).await?;

    svc.delete_tier("b").await?;
    assert_eq!(names(&svc.get_tiers().await?), ["a", "c"]);
    assert!(matches!(svc.get_tier("b").await, Err(ServiceError::NotFound(_))));
    assert!(matches!(svc.delete_tier("b").await, Err(ServiceError::NotFound(_))));

    // the name is free again
    svc.create_tier(TierSpec::new("b", "", 5)).await?;
    assert_eq!(names(&svc.get_tiers().await?), ["a", "c", "b"]);
    Ok(())
}

#[tokio::test]
async fn conflicting_writes_are_retried_on_fresh_state() -> anyhow::Result<()> {
    let (api, svc) = racing_service(2, 5);
    let created = svc.create_tier(TierSpec::new("premium", "", 3)).await?;
    assert_eq!(created.name, "premium");

    // two rivals got in first; both of their tiers and ours survive
    let all = svc.get_tiers().await?;
    assert_eq!(names(&all), ["rival-0", "rival-1", "premium"]);

    api.races.store(1, Ordering::SeqCst);
    let tier = svc.add_group("premium", "vip-users").await?;
    assert_eq!(tier.groups, ["vip-users"]);
    assert_eq!(svc.get_tier("premium").await?.groups, ["vip-users"]);
    assert_eq!(svc.get_tiers().await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn conflicts_beyond_the_budget_surface() -> anyhow::Result<()> {
    let (api, svc) = racing_service(10, 3);
    let err = svc.create_tier(TierSpec::new("premium", "", 3)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert!(err.is_retryable());
    // one load per attempt
    assert_eq!(api.reads.load(Ordering::SeqCst), 3);
    assert!(svc.get_tier("premium").await.is_err());
    Ok(())
}

#[tokio::test]
async fn corrupt_catalog_is_not_retried() -> anyhow::Result<()> {
    let (api, svc) = racing_service(0, 5);
    let key = ObjectKey::new(NAMESPACE, NAME);
    let corrupt = BTreeMap::from([("tiers".to_string(), "{ not: [yaml".to_string())]);
    api.inner.force_put(&key, corrupt).await;

    let err = svc.add_group("premium", "vip-users").await.unwrap_err();
    assert!(matches!(err, ServiceError::CorruptCatalog(_)));
    assert_eq!(api.reads.load(Ordering::SeqCst), 1);
    assert!(matches!(svc.get_tiers().await, Err(ServiceError::CorruptCatalog(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_all_land() -> anyhow::Result<()> {
    let (_, svc) = memory_service();
    let svc = Arc::new(svc.with_retry(RetryPolicy::new(16, Duration::ZERO, Duration::ZERO)));
    svc.create_tier(TierSpec::new("premium", "", 3)).await?;

    let mut handles = Vec::new();
    for i in 0..8 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move {
            svc.add_group("premium", &format!("group-{i}")).await
        }));
    }
    for h in handles {
        h.await??;
    }
    let mut groups = svc.get_tier("premium").await?.groups;
    groups.sort();
    let expected: Vec<String> = (0..8).map(|i| format!("group-{i}")).collect();
    assert_eq!(groups, expected);
    Ok(())
}

#[tokio::test]
async fn file_backend_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config-objects.json");
    let api = Arc::new(JsonFileConfigObjects::new(&path).await?);
    let svc = TierService::new(CatalogStore::new(api, "maas-api", NAME));

    svc.create_tier(TierSpec::new("free", "Free tier", 1).with_groups(["system:authenticated"]))
        .await?;
    svc.create_tier(TierSpec::new("premium", "Premium tier", 3)).await?;
    svc.add_group("premium", "premium-users").await?;

    // a fresh handle on the same file sees everything
    let reopened = Arc::new(JsonFileConfigObjects::new(&path).await?);
    let svc2 = TierService::new(CatalogStore::new(reopened, "maas-api", NAME));
    assert_eq!(names(&svc2.get_tiers().await?), ["free", "premium"]);
    assert_eq!(names(&svc2.get_tiers_by_group("premium-users").await?), ["premium"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_file_handles_never_lose_a_write() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config-objects.json");
    let retry = RetryPolicy::new(100, Duration::ZERO, Duration::ZERO);
    let open = |api: JsonFileConfigObjects| {
        let store = CatalogStore::new(Arc::new(api), "maas-api", NAME);
        Arc::new(TierService::new(store).with_retry(retry.clone()))
    };
    let left = open(JsonFileConfigObjects::new(&path).await?);
    let right = open(JsonFileConfigObjects::new(&path).await?);
    left.create_tier(TierSpec::new("premium", "", 3)).await?;

    let mut handles = Vec::new();
    for i in 0..40 {
        let svc = if i % 2 == 0 { left.clone() } else { right.clone() };
        handles.push(tokio::spawn(async move {
            svc.add_group("premium", &format!("g-{i}")).await
        }));
    }
    for h in handles {
        h.await??;
    }

    let mut groups = right.get_tier("premium").await?.groups;
    groups.sort();
    let mut expected: Vec<String> = (0..40).map(|i| format!("g-{i}")).collect();
    expected.sort();
    assert_eq!(groups, expected);
    Ok(())
}
