//! Record store: models, backings and the actor that serializes access.
//!
//! Layout:
//! - `models.rs`: account/package records as stored and served
//! - `schema.rs`: SQL DDL for the SQLite backing and the demo account seed
//! - `traits.rs`: the `RecordStore` capability interface
//! - `sqlite.rs` / `json_file.rs`: the two interchangeable backings
//! - `actor.rs`: store actor and its `StoreHandle`

pub mod actor;
pub mod json_file;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use actor::{StoreHandle, spawn};
pub use json_file::JsonFileStore;
pub use models::{DbAccount, DbPackage, NewPackage, Role};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, SqliteRecordStore};
pub use traits::RecordStore;

use crate::config::{Config, RecordStoreKind};
use crate::error::StorefrontError;

/// Build the backing selected by `cfg.record_store`.
pub async fn open_record_store(cfg: &Config) -> Result<Box<dyn RecordStore>, StorefrontError> {
    Ok(match cfg.record_store {
        RecordStoreKind::Sqlite => Box::new(SqliteRecordStore::connect(&cfg.database_url).await?),
        RecordStoreKind::Json => Box::new(JsonFileStore::new(&cfg.data_dir)),
    })
}
