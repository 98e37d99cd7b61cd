pub mod apps;
pub mod auth;
