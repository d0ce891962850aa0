//! Request extractors whose rejections use the [`ApiError`] JSON body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::ApiError;

/// JSON request body. Syntax errors, unknown fields and a missing
/// content type answer with `{"error", "kind": "invalid_input"}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path parameters, rejected the same way.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);
