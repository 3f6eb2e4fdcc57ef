//! Storage abstractions for service layer
//!
//! The external config object is reached through [`ConfigObjectApi`]; the
//! in-memory and JSON-file backends implement it for tests and single-host
//! deployments.

pub mod config_object;
pub mod json_file;
pub mod memory;

pub use config_object::{ConfigObject, ConfigObjectApi, ObjectKey, Revision};
pub use json_file::JsonFileConfigObjects;
pub use memory::MemoryConfigObjects;
