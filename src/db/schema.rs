//! SQL DDL for the record store (SQLite).

/// SQLite schema with:
/// - `accounts` keyed by `username`
/// - `packages` keyed by the timestamp-derived `id` assigned by the store actor
/// - `approved` BOOLEAN (stored as INTEGER 0/1), indexed for the two listings
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    username TEXT PRIMARY KEY NOT NULL,
    password TEXT NOT NULL,
    role TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY NOT NULL,
    app_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    icon_path TEXT NOT NULL,
    package_path TEXT NOT NULL,
    uploader TEXT NOT NULL DEFAULT '',
    approved INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_packages_approved ON packages(approved);
"#;

/// Demo accounts inserted into an empty account collection: (username, password, role).
pub const DEMO_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("admin", "admin123", "admin"),
    ("dev", "dev123", "developer"),
];
