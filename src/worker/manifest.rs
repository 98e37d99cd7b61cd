use url::Url;

use crate::worker::fetch::cache_key;

/// Generation tag of the current app shell. Bump it to invalidate every client cache.
pub const CURRENT_GENERATION: &str = "apk-store-v1";

/// Document served to offline navigations.
pub const ROOT_DOCUMENT: &str = "/index.html";

/// App shell assets cached at install time.
pub const APP_SHELL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/admin.html",
    "/developer.html",
    "/profile.html",
    "/settings.html",
    "/login.html",
    "/style.css",
    "/script.js",
    "/manifest.json",
    "/icon-192.png",
    "/icon-512.png",
];

/// Everything that identifies one worker version: its generation tag, the
/// scope it controls and the assets it installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerScript {
    pub generation: String,
    pub scope: Url,
    pub assets: Vec<String>,
    pub fallback_document: String,
}

impl WorkerScript {
    /// The shipped app shell for `scope`.
    pub fn app_shell(scope: Url) -> Self {
        Self::new(
            CURRENT_GENERATION,
            scope,
            APP_SHELL_ASSETS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn new(generation: impl Into<String>, scope: Url, assets: Vec<String>) -> Self {
        Self {
            generation: generation.into(),
            scope,
            assets,
            fallback_document: ROOT_DOCUMENT.to_string(),
        }
    }

    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.scope.join(path)
    }

    pub fn fallback_key(&self) -> Result<String, url::ParseError> {
        Ok(cache_key(&self.resolve(&self.fallback_document)?))
    }
}
