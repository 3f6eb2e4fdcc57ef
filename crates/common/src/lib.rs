//! Shared helpers for the tier catalog binaries.

pub mod utils;
