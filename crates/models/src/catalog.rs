use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ModelError;
use crate::tier::Tier;

/// The whole tier document, kept in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierCatalog {
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

impl TierCatalog {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, ModelError> {
        let catalog = Self { tiers };
        catalog.ensure_unique_names()?;
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tier> {
        self.tiers.iter_mut().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append a tier; fails if the name is taken.
    pub fn insert(&mut self, tier: Tier) -> Result<&Tier, ModelError> {
        if self.contains(&tier.name) {
            return Err(ModelError::DuplicateTier(tier.name));
        }
        self.tiers.push(tier);
        Ok(&self.tiers[self.tiers.len() - 1])
    }

    /// Remove a tier by name, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Tier> {
        let idx = self.tiers.iter().position(|t| t.name == name)?;
        Some(self.tiers.remove(idx))
    }

    /// Every tier whose groups contain `group`, in catalog order.
    pub fn tiers_in_group(&self, group: &str) -> Vec<Tier> {
        self.tiers.iter().filter(|t| t.has_group(group)).cloned().collect()
    }

    pub fn ensure_unique_names(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            if !seen.insert(tier.name.as_str()) {
                return Err(ModelError::DuplicateTier(tier.name.clone()));
            }
        }
        Ok(())
    }

    /// Parse the YAML sequence stored in the config object's data entry.
    /// A blank or null document is an empty catalog.
    pub fn from_document(doc: &str) -> Result<Self, ModelError> {
        if doc.trim().is_empty() {
            return Ok(Self::default());
        }
        let tiers: Option<Vec<Tier>> =
            serde_yaml::from_str(doc).map_err(|e| ModelError::Document(e.to_string()))?;
        let catalog = Self::new(tiers.unwrap_or_default())?;
        debug!(tiers = catalog.len(), "parsed tier document");
        Ok(catalog)
    }

    pub fn to_document(&self) -> Result<String, ModelError> {
        serde_yaml::to_string(&self.tiers).map_err(|e| ModelError::Document(e.to_string()))
    }
}
