use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. Anything unrecognised is a plain user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    Admin,
    Developer,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Role::User)
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "admin" => Role::Admin,
            "developer" => Role::Developer,
            _ => Role::User,
        })
    }
}

/// Stored account. The password is kept in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbAccount {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Stored package record, serialized with the field names the client reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbPackage {
    pub id: i64,
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "icon")]
    pub icon_path: String,
    #[serde(rename = "apk")]
    pub package_path: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub approved: bool,
}

/// Package fields supplied at upload time; id and approval are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPackage {
    pub app_name: String,
    pub description: String,
    pub icon_path: String,
    pub package_path: String,
    pub uploader: String,
}

impl NewPackage {
    pub fn into_record(self, id: i64) -> DbPackage {
        DbPackage {
            id,
            app_name: self.app_name,
            description: self.description,
            icon_path: self.icon_path,
            package_path: self.package_path,
            uploader: self.uploader,
            approved: false,
        }
    }
}
