use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::db::models::Role;

/// Storage key of the signed-in session.
pub const SESSION_KEY: &str = "apk_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

/// String key/value storage local to the browser profile.
pub trait SessionStorage: Send {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&mut self, key: &str, value: String);
    fn remove_item(&mut self, key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_string(), value);
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}

/// The stored session; an unreadable value counts as signed out.
pub fn load_session(storage: &dyn SessionStorage) -> Option<Session> {
    let raw = storage.get_item(SESSION_KEY)?;
    serde_json::from_str(&raw)
        .inspect_err(|e| warn!(error = %e, "stored session is not valid JSON; ignoring"))
        .ok()
}

pub fn save_session(storage: &mut dyn SessionStorage, session: &Session) -> Result<(), serde_json::Error> {
    storage.set_item(SESSION_KEY, serde_json::to_string(session)?);
    Ok(())
}

pub fn clear_session(storage: &mut dyn SessionStorage) {
    storage.remove_item(SESSION_KEY);
}
