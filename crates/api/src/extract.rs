//! Request extractors whose rejections use the JSON error shape.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` with rejections routed through [`AppError`], so a malformed
/// body answers with `{error, code, details}` instead of plain text.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
