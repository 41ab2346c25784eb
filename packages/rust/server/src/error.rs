//! HTTP mapping for pipeline errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ideascope_shared::IdeaScopeError;

/// Prefix of every failure body returned by `POST /chat`.
pub const ERROR_PREFIX: &str = "Error communicating with APIs";

/// A failed evaluation. Renders as `500` with a plain-text body carrying
/// only the upstream message; stage and provider details stay in the logs.
#[derive(Debug)]
pub struct ApiError(pub IdeaScopeError);

impl From<IdeaScopeError> for ApiError {
    fn from(err: IdeaScopeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = format!("{ERROR_PREFIX}: {}", self.0.upstream_message());
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
