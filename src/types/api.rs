//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::db::models::{DbPackage, Role};
use crate::error::StorefrontError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub role: Role,
    pub username: String,
}

/// Package id as sent by the admin console: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRequest {
    pub id: Option<IdValue>,
}

impl IdRequest {
    pub fn id(&self) -> Result<i64, StorefrontError> {
        match &self.id {
            Some(IdValue::Number(n)) => Ok(*n),
            Some(IdValue::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| StorefrontError::Validation(format!("invalid app id `{s}`"))),
            None => Err(StorefrontError::Validation("missing app id".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub app: DbPackage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Profile,
}

/// Placeholder settings; not persisted per account yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub theme: String,
    pub notifications: bool,
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications: true,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: Settings,
}
