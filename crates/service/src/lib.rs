//! Service layer for the tier catalog.
//! - `storage`: the external config object boundary and its backends.
//! - `catalog`: loading/saving the tier document with optimistic concurrency.
//! - `tiers`: tier operations as bounded read-modify-write cycles.

pub mod errors;
pub mod storage;
pub mod catalog;
pub mod tiers;

pub use catalog::{CatalogSnapshot, CatalogStore};
pub use errors::ServiceError;
pub use tiers::{RetryPolicy, TierService};
