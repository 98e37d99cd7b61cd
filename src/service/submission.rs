use tracing::{info, warn};

use crate::db::StoreHandle;
use crate::db::models::{DbPackage, NewPackage};
use crate::error::StorefrontError;
use crate::middleware::UploadForm;
use crate::storage::{BlobKind, BlobStore};

/// Validate an upload, store both files, then record the package as pending.
///
/// Nothing is written unless both files are present. Blobs already written are
/// removed again when a later step fails.
pub async fn submit_package(
    store: &StoreHandle,
    blobs: &BlobStore,
    form: UploadForm,
) -> Result<DbPackage, StorefrontError> {
    let (Some(icon), Some(apk)) = (form.icon, form.apk) else {
        return Err(StorefrontError::Validation(
            "Icon and APK are required".to_string(),
        ));
    };
    let app_name = form.app_name.unwrap_or_default().trim().to_string();
    if app_name.is_empty() {
        return Err(StorefrontError::Validation(
            "App name is required".to_string(),
        ));
    }

    let icon_blob = blobs.put(BlobKind::Icon, &icon.file_name, &icon.bytes).await?;
    let apk_blob = match blobs.put(BlobKind::Package, &apk.file_name, &apk.bytes).await {
        Ok(b) => b,
        Err(e) => {
            blobs.remove(&icon_blob).await;
            return Err(e);
        }
    };

    let new_package = NewPackage {
        app_name,
        description: form.description.unwrap_or_default(),
        icon_path: icon_blob.url_path.clone(),
        package_path: apk_blob.url_path.clone(),
        uploader: form.uploader.unwrap_or_default(),
    };

    match store.insert_package(new_package).await {
        Ok(package) => {
            info!(
                id = package.id,
                app = %package.app_name,
                uploader = %package.uploader,
                "package submitted for approval"
            );
            Ok(package)
        }
        Err(e) => {
            warn!(error = %e, "recording package failed; removing uploaded files");
            blobs.remove(&icon_blob).await;
            blobs.remove(&apk_blob).await;
            Err(e)
        }
    }
}
