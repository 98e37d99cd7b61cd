use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::StorefrontError;

/// URL prefix the upload directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Icon,
    Package,
}

impl BlobKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            BlobKind::Icon => "icons",
            BlobKind::Package => "apks",
        }
    }
}

/// A file written by the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Public path, e.g. `/uploads/icons/1700000000000.png`.
    pub url_path: String,
    pub fs_path: PathBuf,
}

/// Upload directory with one subdirectory per [`BlobKind`].
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn init(&self) -> Result<(), StorefrontError> {
        for kind in [BlobKind::Icon, BlobKind::Package] {
            fs::create_dir_all(self.root.join(kind.dir_name())).await?;
        }
        Ok(())
    }

    /// Write `bytes` as `<millis><ext>`, where `ext` comes from `original_name`.
    /// Never overwrites: a taken name moves on to the next millisecond.
    pub async fn put(
        &self,
        kind: BlobKind,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, StorefrontError> {
        let dir = self.root.join(kind.dir_name());
        let ext = extension_of(original_name);
        let mut stamp = Utc::now().timestamp_millis();

        loop {
            let file_name = format!("{stamp}{ext}");
            let fs_path = dir.join(&file_name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&fs_path)
                .await
            {
                Ok(mut file) => {
                    if let Err(e) = write_all(&mut file, bytes).await {
                        drop(file);
                        let _ = fs::remove_file(&fs_path).await;
                        return Err(e.into());
                    }
                    debug!(path = %fs_path.display(), size = bytes.len(), "blob stored");
                    return Ok(StoredBlob {
                        url_path: format!("{UPLOADS_URL_PREFIX}/{}/{file_name}", kind.dir_name()),
                        fs_path,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Best-effort removal; failures are logged, not returned.
    pub async fn remove(&self, blob: &StoredBlob) {
        if let Err(e) = fs::remove_file(&blob.fs_path).await {
            warn!(path = %blob.fs_path.display(), error = %e, "failed to remove blob");
        }
    }
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await
}

/// `.ext` of the uploaded file name, or empty when it has none we can safely reuse.
fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}
