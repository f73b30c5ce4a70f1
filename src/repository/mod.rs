//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
mod db;
mod kv;
mod local_store;
mod sqlite_store;

#[cfg(test)]
mod tests;

pub use traits::{CampaignScopedRepository, ContactRepository, FormGateway, Repository};
pub use db::init_db;
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use local_store::LocalFormStore;
pub use sqlite_store::SqliteFormStore;
