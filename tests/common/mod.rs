#![allow(dead_code)]

use apk_storefront::config::{Config, RecordStoreKind};
use apk_storefront::db::RecordStore;
use apk_storefront::storage::BlobStore;
use apk_storefront::{StorefrontState, storefront_router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub const BOUNDARY: &str = "storefront-test-boundary";

/// Unique scratch directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "storefront-{label}-{}-{}",
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&path).expect("failed to create temp dir");
    path
}

pub struct TestApp {
    pub router: Router,
    pub root: PathBuf,
    pub config: Arc<Config>,
}

/// The `frontend/` bundle shipped with the crate.
pub fn shipped_frontend() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("frontend")
}

impl TestApp {
    pub async fn spawn(label: &str, kind: RecordStoreKind) -> Self {
        Self::spawn_with(label, kind, |_| {}, None).await
    }

    /// Like [`TestApp::spawn`], with config overrides and an optional record
    /// store used in place of the configured backing.
    pub async fn spawn_with(
        label: &str,
        kind: RecordStoreKind,
        configure: impl FnOnce(&mut Config),
        record_store: Option<Box<dyn RecordStore>>,
    ) -> Self {
        let root = temp_dir(label);
        let frontend_dir = root.join("frontend");
        fs::create_dir_all(&frontend_dir).expect("failed to create frontend dir");
        fs::write(
            frontend_dir.join("index.html"),
            "<!DOCTYPE html><title>APK Store</title>",
        )
        .expect("failed to write index.html");
        fs::write(frontend_dir.join("style.css"), "body{}").expect("failed to write style.css");

        let mut cfg = Config {
            record_store: kind,
            database_url: format!("sqlite:{}", root.join("store.db").display()),
            data_dir: root.join("data"),
            upload_dir: root.join("uploads"),
            frontend_dir,
            ..Config::default()
        };

        configure(&mut cfg);

        let record_store = match record_store {
            Some(store) => store,
            None => apk_storefront::db::open_record_store(&cfg)
                .await
                .expect("failed to open record store"),
        };
        let store = apk_storefront::db::spawn(record_store, true)
            .await
            .expect("failed to spawn store actor");
        let blobs = BlobStore::new(&cfg.upload_dir);
        blobs.init().await.expect("failed to create upload dirs");

        let config = Arc::new(cfg);
        let state = StorefrontState::new(store, blobs, config.clone());
        Self {
            router: storefront_router(state),
            root,
            config,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("request failed");
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        (status, body.to_vec())
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("failed to build request");
        let (status, bytes) = self.send(req).await;
        let value = serde_json::from_slice(&bytes).expect("response body was not JSON");
        (status, value)
    }

    pub async fn upload(&self, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/upload-app")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("failed to build request");
        let (status, bytes) = self.send(req).await;
        (status, serde_json::from_slice(&bytes).expect("response body was not JSON"))
    }

    pub async fn upload_app(&self, name: &str, description: &str) -> Value {
        let (status, body) = self
            .upload(&[
                Part::Text("appName", name),
                Part::Text("description", description),
                Part::Text("uploader", "dev"),
                Part::File("icon", "icon.png", b"PNGDATA"),
                Part::File("apk", "app.apk", b"APKDATA"),
            ])
            .await;
        assert_eq!(status, StatusCode::OK, "upload failed: {body}");
        body["app"].clone()
    }

    pub async fn approved_ids(&self) -> Vec<i64> {
        ids(self.send_json("GET", "/apps", None).await.1)
    }

    pub async fn pending_ids(&self) -> Vec<i64> {
        ids(self.send_json("GET", "/pending-apps", None).await.1)
    }

    pub fn files_in(&self, sub: &str) -> usize {
        fs::read_dir(self.config.upload_dir.join(sub))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn ids(list: Value) -> Vec<i64> {
    list.as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|p| p["id"].as_i64().expect("package id"))
        .collect()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
