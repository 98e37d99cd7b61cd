//! Flat-file record store: `users.json` and `apps.json` as pretty-printed arrays.

use crate::db::models::{DbAccount, DbPackage};
use crate::db::traits::RecordStore;
use crate::error::StorefrontError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub const USERS_FILE: &str = "users.json";
pub const APPS_FILE: &str = "apps.json";

pub struct JsonFileStore {
    users_path: PathBuf,
    apps_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            users_path: dir.join(USERS_FILE),
            apps_path: dir.join(APPS_FILE),
        }
    }

    async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorefrontError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StorefrontError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        fs::write(path, bytes).await?;
        debug!(path = %path.display(), count = items.len(), "record file written");
        Ok(())
    }

    async fn ensure_file(path: &Path) -> Result<(), StorefrontError> {
        if fs::try_exists(path).await? {
            return Ok(());
        }
        Self::write_list::<DbPackage>(path, &[]).await
    }

    async fn packages(&self) -> Result<Vec<DbPackage>, StorefrontError> {
        Self::read_list(&self.apps_path).await
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn init(&self) -> Result<(), StorefrontError> {
        if let Some(parent) = self.apps_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Self::ensure_file(&self.users_path).await?;
        Self::ensure_file(&self.apps_path).await
    }

    async fn find_account(&self, username: &str) -> Result<Option<DbAccount>, StorefrontError> {
        let accounts: Vec<DbAccount> = Self::read_list(&self.users_path).await?;
        Ok(accounts.into_iter().find(|a| a.username == username))
    }

    async fn count_accounts(&self) -> Result<usize, StorefrontError> {
        let accounts: Vec<DbAccount> = Self::read_list(&self.users_path).await?;
        Ok(accounts.len())
    }

    async fn insert_account(&self, account: DbAccount) -> Result<(), StorefrontError> {
        let mut accounts: Vec<DbAccount> = Self::read_list(&self.users_path).await?;
        if accounts.iter().any(|a| a.username == account.username) {
            return Err(StorefrontError::Validation(format!(
                "account {} already exists",
                account.username
            )));
        }
        accounts.push(account);
        Self::write_list(&self.users_path, &accounts).await
    }

    async fn max_package_id(&self) -> Result<Option<i64>, StorefrontError> {
        Ok(self.packages().await?.iter().map(|p| p.id).max())
    }

    async fn insert_package(&self, package: DbPackage) -> Result<(), StorefrontError> {
        let mut apps = self.packages().await?;
        apps.push(package);
        Self::write_list(&self.apps_path, &apps).await
    }

    async fn list_packages(&self, approved: bool) -> Result<Vec<DbPackage>, StorefrontError> {
        let mut apps: Vec<DbPackage> = self
            .packages()
            .await?
            .into_iter()
            .filter(|p| p.approved == approved)
            .collect();
        apps.sort_by_key(|p| p.id);
        Ok(apps)
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<bool, StorefrontError> {
        let mut apps = self.packages().await?;
        let Some(app) = apps.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        app.approved = approved;
        Self::write_list(&self.apps_path, &apps).await?;
        Ok(true)
    }

    async fn delete_package(&self, id: i64) -> Result<bool, StorefrontError> {
        let mut apps = self.packages().await?;
        let before = apps.len();
        apps.retain(|p| p.id != id);
        if apps.len() == before {
            return Ok(false);
        }
        Self::write_list(&self.apps_path, &apps).await?;
        Ok(true)
    }
}
