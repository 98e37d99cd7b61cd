use crate::db::models::{DbAccount, DbPackage};
use crate::db::schema::SQLITE_INIT;
use crate::db::traits::RecordStore;
use crate::error::StorefrontError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

const PACKAGE_COLUMNS: &str =
    "id, app_name, description, icon_path, package_path, uploader, approved";

#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StorefrontError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_opts)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_package(row: SqliteRow) -> Result<DbPackage, StorefrontError> {
        let approved_i: i64 = row.try_get("approved")?;
        Ok(DbPackage {
            id: row.try_get("id")?,
            app_name: row.try_get("app_name")?,
            description: row.try_get("description")?,
            icon_path: row.try_get("icon_path")?,
            package_path: row.try_get("package_path")?,
            uploader: row.try_get("uploader")?,
            approved: approved_i != 0,
        })
    }

    fn row_to_account(row: SqliteRow) -> Result<DbAccount, StorefrontError> {
        let role: String = row.try_get("role")?;
        Ok(DbAccount {
            username: row.try_get("username")?,
            password: row.try_get("password")?,
            role: role.into(),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn init(&self) -> Result<(), StorefrontError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn find_account(&self, username: &str) -> Result<Option<DbAccount>, StorefrontError> {
        let row = sqlx::query("SELECT username, password, role FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_account).transpose()
    }

    async fn count_accounts(&self) -> Result<usize, StorefrontError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0 as usize)
    }

    async fn insert_account(&self, account: DbAccount) -> Result<(), StorefrontError> {
        sqlx::query("INSERT INTO accounts (username, password, role) VALUES (?, ?, ?)")
            .bind(account.username)
            .bind(account.password)
            .bind(account.role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn max_package_id(&self) -> Result<Option<i64>, StorefrontError> {
        let rec: (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM packages")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0)
    }

    async fn insert_package(&self, package: DbPackage) -> Result<(), StorefrontError> {
        let approved_i = if package.approved { 1 } else { 0 };
        sqlx::query(
            r#"
            INSERT INTO packages (
                id, app_name, description, icon_path, package_path, uploader, approved
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(package.id)
        .bind(package.app_name)
        .bind(package.description)
        .bind(package.icon_path)
        .bind(package.package_path)
        .bind(package.uploader)
        .bind(approved_i)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_packages(&self, approved: bool) -> Result<Vec<DbPackage>, StorefrontError> {
        let approved_i = if approved { 1 } else { 0 };
        let rows = sqlx::query(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE approved = ? ORDER BY id"
        ))
        .bind(approved_i)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_package).collect()
    }

    async fn set_approved(&self, id: i64, approved: bool) -> Result<bool, StorefrontError> {
        let approved_i = if approved { 1 } else { 0 };
        let res = sqlx::query("UPDATE packages SET approved = ? WHERE id = ?")
            .bind(approved_i)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_package(&self, id: i64) -> Result<bool, StorefrontError> {
        let res = sqlx::query("DELETE FROM packages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
