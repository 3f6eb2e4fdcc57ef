use models::validation::validate_group;
use models::{Tier, TierSpec, TierUpdate};
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogStore;
use crate::errors::ServiceError;
use crate::storage::ConfigObjectApi;

use super::mutation::TierMutation;
use super::retry::RetryPolicy;

/// Tier business service independent of transport.
///
/// Writes run as load -> apply -> save cycles against the [`CatalogStore`];
/// a save that loses a race is retried on a fresh load within the
/// [`RetryPolicy`] budget. Input validation happens before any storage access.
pub struct TierService<A: ConfigObjectApi + ?Sized> {
    store: CatalogStore<A>,
    retry: RetryPolicy,
}

impl<A: ConfigObjectApi + ?Sized> TierService<A> {
    pub fn new(store: CatalogStore<A>) -> Self { Self { store, retry: RetryPolicy::default() } }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &CatalogStore<A> { &self.store }

    /// Create a tier. Omitted groups are stored as an empty sequence.
    #[instrument(skip(self, spec), fields(tier = %spec.name))]
    pub async fn create_tier(&self, spec: TierSpec) -> Result<Tier, ServiceError> {
        let tier = spec.into_tier()?;
        self.run(TierMutation::Create(tier)).await
    }

    /// All tiers in catalog order.
    pub async fn get_tiers(&self) -> Result<Vec<Tier>, ServiceError> {
        Ok(self.store.load().await?.catalog.tiers)
    }

    pub async fn get_tier(&self, name: &str) -> Result<Tier, ServiceError> {
        let snapshot = self.store.load().await?;
        snapshot.catalog.get(name).cloned().ok_or_else(|| ServiceError::tier_not_found(name))
    }

    /// Replace description, level and groups of an existing tier.
    #[instrument(skip(self, update), fields(tier = %name))]
    pub async fn update_tier(&self, name: &str, update: TierUpdate) -> Result<Tier, ServiceError> {
        let update = update.normalized()?;
        self.run(TierMutation::Update { name: name.to_string(), update }).await
    }

    #[instrument(skip(self), fields(tier = %name))]
    pub async fn delete_tier(&self, name: &str) -> Result<(), ServiceError> {
        self.run(TierMutation::Delete { name: name.to_string() }).await?;
        Ok(())
    }

    /// Add `group` to a tier; adding a group the tier already has is a no-op.
    #[instrument(skip(self), fields(tier = %tier, group = %group))]
    pub async fn add_group(&self, tier: &str, group: &str) -> Result<Tier, ServiceError> {
        validate_group(group)?;
        self.run(TierMutation::AddGroup {
            tier: tier.to_string(),
            group: group.to_string(),
        })
        .await
    }

    /// Remove `group` from a tier; removing an absent group is a no-op.
    #[instrument(skip(self), fields(tier = %tier, group = %group))]
    pub async fn remove_group(&self, tier: &str, group: &str) -> Result<Tier, ServiceError> {
        self.run(TierMutation::RemoveGroup {
            tier: tier.to_string(),
            group: group.to_string(),
        })
        .await
    }

    /// Tiers granting `group`, in catalog order. No match is an empty list.
    #[instrument(skip(self), fields(group = %group))]
    pub async fn get_tiers_by_group(&self, group: &str) -> Result<Vec<Tier>, ServiceError> {
        validate_group(group)?;
        let snapshot = self.store.load().await?;
        let tiers = snapshot.catalog.tiers_in_group(group);
        debug!(matched = tiers.len(), "tiers by group");
        Ok(tiers)
    }

    async fn run(&self, mutation: TierMutation) -> Result<Tier, ServiceError> {
        let op = mutation.name();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let snapshot = self.store.load().await?;
            let applied = mutation.apply(&snapshot.catalog)?;
            if !applied.changed {
                debug!(op, tier = mutation.tier_name(), "catalog unchanged; skipping write");
                return Ok(applied.tier);
            }
            let tier = mutation.tier_name();
            match self.store.save(&applied.catalog, snapshot.revision.as_ref()).await {
                Ok(revision) => {
                    info!(op, tier, attempt, %revision, "tier_catalog_updated");
                    return Ok(applied.tier);
                }
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    warn!(op, tier, attempt, error = %e, "catalog write conflict; reloading");
                    self.retry.wait_before_retry(attempt).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(
                            op,
                            tier,
                            attempt,
                            error = %e,
                            "catalog write conflict; retries exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
