use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

pub const INVALID_BODY: &str = "Invalid request body.";

/// `Json<T>` whose rejections (bad syntax, wrong content type, missing, mistyped or unknown
/// fields) become a 422 `{"errors": [...]}` instead of axum's plain-text response.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => {
                debug!(error = %rejection, "rejected request body");
                Err(AppError::validation(INVALID_BODY))
            }
        }
    }
}
