pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use error::{ClientError, StorefrontError, WorkerError};
pub use router::{StorefrontState, storefront_router};
