use models::{Tier, TierCatalog, TierUpdate};

use crate::errors::ServiceError;

/// One logical change to the catalog. Inputs are expected to be validated
/// already; `apply` only checks what depends on the catalog contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierMutation {
    Create(Tier),
    Update { name: String, update: TierUpdate },
    Delete { name: String },
    AddGroup { tier: String, group: String },
    RemoveGroup { tier: String, group: String },
}

/// Result of applying a mutation to a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub catalog: TierCatalog,
    /// The created/updated tier, or the removed one for `Delete`.
    pub tier: Tier,
    /// False when the catalog came out identical and need not be written.
    pub changed: bool,
}

impl TierMutation {
    pub fn name(&self) -> &'static str {
        match self {
            TierMutation::Create(_) => "create",
            TierMutation::Update { .. } => "update",
            TierMutation::Delete { .. } => "delete",
            TierMutation::AddGroup { .. } => "add_group",
            TierMutation::RemoveGroup { .. } => "remove_group",
        }
    }

    pub fn tier_name(&self) -> &str {
        match self {
            TierMutation::Create(t) => &t.name,
            TierMutation::Update { name, .. } | TierMutation::Delete { name } => name,
            TierMutation::AddGroup { tier, .. } | TierMutation::RemoveGroup { tier, .. } => tier,
        }
    }

    /// Pure function of the current catalog; safe to repeat on a fresh load.
    pub fn apply(&self, current: &TierCatalog) -> Result<Applied, ServiceError> {
        let mut catalog = current.clone();
        let tier = match self {
            TierMutation::Create(tier) => {
                if catalog.contains(&tier.name) {
                    return Err(ServiceError::tier_exists(&tier.name));
                }
                catalog.insert(tier.clone())?.clone()
            }
            TierMutation::Update { name, update } => {
                let existing =
                    catalog.get_mut(name).ok_or_else(|| ServiceError::tier_not_found(name))?;
                update.apply_to(existing);
                existing.clone()
            }
            TierMutation::Delete { name } => {
                catalog.remove(name).ok_or_else(|| ServiceError::tier_not_found(name))?
            }
            TierMutation::AddGroup { tier, group } => {
                let existing =
                    catalog.get_mut(tier).ok_or_else(|| ServiceError::tier_not_found(tier))?;
                if !existing.has_group(group) {
                    existing.groups.push(group.clone());
                }
                existing.clone()
            }
            TierMutation::RemoveGroup { tier, group } => {
                let existing =
                    catalog.get_mut(tier).ok_or_else(|| ServiceError::tier_not_found(tier))?;
                existing.groups.retain(|g| g != group);
                existing.clone()
            }
        };
        let changed = catalog != *current;
        Ok(Applied { catalog, tier, changed })
    }
}
