use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::Config;
use crate::db::StoreHandle;
use crate::handlers::{apps, auth};
use crate::storage::{BlobStore, UPLOADS_URL_PREFIX};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct StorefrontState {
    pub store: StoreHandle,
    pub blobs: BlobStore,
    pub config: Arc<Config>,
}

impl StorefrontState {
    pub fn new(store: StoreHandle, blobs: BlobStore, config: Arc<Config>) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }
}

pub fn storefront_router(state: StorefrontState) -> Router {
    let frontend_dir = state.config.frontend_dir.clone();
    let root_document = ServeFile::new(frontend_dir.join("index.html"));
    let frontend = ServeDir::new(&frontend_dir).fallback(root_document);
    let uploads = ServeDir::new(state.blobs.root());

    Router::new()
        .route("/login", post(auth::login))
        .route(
            "/upload-app",
            post(apps::upload_app).layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/apps", get(apps::list_apps))
        .route("/apps/{id}", delete(apps::delete_app))
        .route("/pending-apps", get(apps::list_pending))
        .route("/approve-app", post(apps::approve_app))
        .route("/reject-app", post(apps::reject_app))
        .route("/profile/{username}", get(auth::profile))
        .route("/settings/{username}", get(auth::settings))
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .fallback_service(frontend)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
