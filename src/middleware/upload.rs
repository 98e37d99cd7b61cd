use axum::extract::{FromRequest, Multipart, Request};

use crate::error::StorefrontError;

/// One file part of the upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Parsed `multipart/form-data` body of `POST /upload-app`.
///
/// Presence is not validated here; a missing field stays `None`.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub app_name: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub icon: Option<UploadedFile>,
    pub apk: Option<UploadedFile>,
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = StorefrontError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| StorefrontError::Validation(rejection.body_text()))?;

        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            // Parts without a file name are plain text fields.
            match (name.as_str(), field.file_name().map(str::to_owned)) {
                ("icon", Some(file_name)) => {
                    form.icon = Some(UploadedFile {
                        file_name,
                        bytes: field.bytes().await?.to_vec(),
                    });
                }
                ("apk", Some(file_name)) => {
                    form.apk = Some(UploadedFile {
                        file_name,
                        bytes: field.bytes().await?.to_vec(),
                    });
                }
                ("appName", _) => form.app_name = Some(field.text().await?),
                ("description", _) => form.description = Some(field.text().await?),
                ("uploader", _) => form.uploader = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }
}
