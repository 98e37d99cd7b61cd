use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::StorefrontError;

/// `Json<T>` whose rejection (bad syntax, wrong shape, missing content type)
/// is reported as a validation failure in the usual `{success, message}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = StorefrontError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| StorefrontError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
