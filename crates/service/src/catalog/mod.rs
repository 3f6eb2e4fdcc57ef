//! Catalog store: the tier document inside the backing config object.

pub mod store;

pub use store::{CatalogSnapshot, CatalogStore, DEFAULT_DATA_KEY};
