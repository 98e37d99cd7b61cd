//! Offline cache worker: a cache-first interceptor whose state is one cache
//! bucket per generation.
//!
//! Layout:
//! - `manifest.rs`: generation tag and app shell asset list
//! - `fetch.rs`: request/response model and the `Network` seam
//! - `cache.rs`: named cache buckets
//! - `actor.rs`: one actor per generation (install, activate, intercept)
//! - `host.rs`: page registry, registration and fetch routing

pub mod actor;
pub mod cache;
pub mod fetch;
pub mod host;
pub mod manifest;

pub use actor::{ActivateOutcome, InstallOutcome, WorkerHandle};
pub use cache::{CacheStorage, MemoryCacheStorage};
pub use fetch::{HttpNetwork, Network, Request, RequestMode, Response, ResponseType};
pub use host::{ClientRegistry, Clients, PageId, RegistrationOutcome, ServiceHost};
pub use manifest::{APP_SHELL_ASSETS, CURRENT_GENERATION, ROOT_DOCUMENT, WorkerScript};

/// Lifecycle of one worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Installing,
    Installed,
    Activating,
    Activated,
    /// Failed to install/activate, or superseded by a newer generation.
    Redundant,
}
