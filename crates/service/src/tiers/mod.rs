//! Tier module: pure catalog mutations, the conflict retry policy, and the
//! service that runs them against the catalog store.

pub mod mutation;
pub mod retry;
pub mod service;

pub use mutation::{Applied, TierMutation};
pub use retry::RetryPolicy;
pub use service::TierService;
