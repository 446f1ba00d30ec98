//! Request extractors that report failures in the API's JSON envelope.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection},
};

use crate::Error;

/// A JSON request body.
///
/// Behaves like [axum::Json], except that a body that cannot be deserialized
/// is rejected with [Error::InvalidRequest] so that the client receives the
/// usual `{success: false, error}` response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

/// A path parameter.
///
/// Behaves like [axum::extract::Path], except that a parameter that cannot be
/// parsed, e.g. a non-numeric ID, is rejected with [Error::InvalidRequest].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}
