pub mod auth;
pub mod submission;

pub use auth::authenticate;
pub use submission::submit_package;
