use std::collections::BTreeMap;
use std::sync::Arc;

use models::TierCatalog;
use tracing::{debug, instrument};

use crate::errors::ServiceError;
use crate::storage::{ConfigObjectApi, ObjectKey, Revision};

/// Data entry of the config object that holds the tier document.
pub const DEFAULT_DATA_KEY: &str = "tiers";

/// A loaded catalog together with the revision it was read at.
/// `revision` is `None` when the backing object does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub catalog: TierCatalog,
    pub revision: Option<Revision>,
}

/// Loads and saves the tier catalog stored in one config object.
///
/// Every `load` re-reads the backend; a `save` is conditional on the revision
/// returned by the `load` it pairs with.
pub struct CatalogStore<A: ConfigObjectApi + ?Sized> {
    api: Arc<A>,
    key: ObjectKey,
    data_key: String,
}

impl<A: ConfigObjectApi + ?Sized> CatalogStore<A> {
    pub fn new(api: Arc<A>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { api, key: ObjectKey::new(namespace, name), data_key: DEFAULT_DATA_KEY.to_string() }
    }

    pub fn with_data_key(mut self, data_key: impl Into<String>) -> Self {
        self.data_key = data_key.into();
        self
    }

    pub fn key(&self) -> &ObjectKey { &self.key }

    pub fn data_key(&self) -> &str { &self.data_key }

    /// Fetch the catalog. A missing object is an empty catalog, a missing or
    /// blank entry inside an existing object as well.
    #[instrument(skip(self), fields(object = %self.key))]
    pub async fn load(&self) -> Result<CatalogSnapshot, ServiceError> {
        let Some(obj) = self.api.get(&self.key).await? else {
            debug!("config object absent; treating as empty catalog");
            return Ok(CatalogSnapshot { catalog: TierCatalog::default(), revision: None });
        };
        let catalog = match obj.data.get(&self.data_key) {
            Some(doc) => TierCatalog::from_document(doc).map_err(|e| {
                let at = format!("{} entry '{}'", self.key, self.data_key);
                ServiceError::CorruptCatalog(format!("{at}: {e}"))
            })?,
            None => TierCatalog::default(),
        };
        debug!(tiers = catalog.len(), revision = %obj.revision, "catalog loaded");
        Ok(CatalogSnapshot { catalog, revision: Some(obj.revision) })
    }

    /// Write the catalog back. Creates the object when `revision` is `None`,
    /// otherwise patches it on the condition that it is still at `revision`.
    #[instrument(skip(self, catalog), fields(object = %self.key, tiers = catalog.len()))]
    pub async fn save(
        &self,
        catalog: &TierCatalog,
        revision: Option<&Revision>,
    ) -> Result<Revision, ServiceError> {
        catalog.ensure_unique_names()?;
        let doc = catalog.to_document().map_err(|e| ServiceError::Storage(e.to_string()))?;
        let new_rev = match revision {
            None => {
                let data = BTreeMap::from([(self.data_key.clone(), doc)]);
                self.api.create(&self.key, data).await?
            }
            Some(rev) => self.api.patch_entry(&self.key, rev, &self.data_key, doc).await?,
        };
        debug!(revision = %new_rev, "catalog saved");
        Ok(new_rev)
    }
}
