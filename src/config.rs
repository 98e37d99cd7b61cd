use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Which backing the record store runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStoreKind {
    #[default]
    Sqlite,
    /// `users.json` + `apps.json` under `data_dir`.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    pub record_store: RecordStoreKind,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub seed_demo_accounts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            record_store: RecordStoreKind::Sqlite,
            database_url: "sqlite:storefront.db".to_string(),
            data_dir: PathBuf::from("data"),
            upload_dir: PathBuf::from("uploads"),
            frontend_dir: PathBuf::from("frontend"),
            max_upload_bytes: 256 * 1024 * 1024,
            seed_demo_accounts: true,
        }
    }
}

impl Config {
    /// Defaults overridden by `STOREFRONT_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("STOREFRONT_"))
            .extract()
    }
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| panic!("FATAL: invalid STOREFRONT_* configuration: {e}"))
});
