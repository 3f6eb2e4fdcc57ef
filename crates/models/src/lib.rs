//! Tier catalog data model: tiers, their create/update inputs, the naming
//! policy, and the YAML document the catalog is persisted as.

pub mod errors;
pub mod validation;
pub mod tier;
pub mod catalog;

pub use catalog::TierCatalog;
pub use errors::ModelError;
pub use tier::{Tier, TierSpec, TierUpdate};
