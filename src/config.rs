//! Configuration loader, schema types and the flat strategy store.
//!
//! `Settings` drives the binary (scan options, stage list, logging) and is
//! loaded from environment and an optional TOML file. `ConfigStore` is the
//! flat key/value store strategies and condition sets persist themselves to.

mod load;
mod schema;
mod store;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;
pub use store::{ConfigStore, LIST_SEPARATOR};
