use async_trait::async_trait;

use crate::db::models::{DbAccount, DbPackage};
use crate::error::StorefrontError;

/// Capability interface over the two record collections.
///
/// Implementations are driven serially by the store actor, so they do not
/// need their own locking.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create tables/files if they do not exist yet.
    async fn init(&self) -> Result<(), StorefrontError>;

    async fn find_account(&self, username: &str) -> Result<Option<DbAccount>, StorefrontError>;

    async fn count_accounts(&self) -> Result<usize, StorefrontError>;

    async fn insert_account(&self, account: DbAccount) -> Result<(), StorefrontError>;

    /// Highest package id ever stored, used to keep ids monotonic across restarts.
    async fn max_package_id(&self) -> Result<Option<i64>, StorefrontError>;

    async fn insert_package(&self, package: DbPackage) -> Result<(), StorefrontError>;

    /// Packages with the given approval flag, ascending by id.
    async fn list_packages(&self, approved: bool) -> Result<Vec<DbPackage>, StorefrontError>;

    /// Returns false when no package has this id.
    async fn set_approved(&self, id: i64, approved: bool) -> Result<bool, StorefrontError>;

    /// Returns false when no package has this id.
    async fn delete_package(&self, id: i64) -> Result<bool, StorefrontError>;
}
