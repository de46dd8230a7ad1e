//! Request extractors with the API's error envelope.

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor whose rejections render as [`AppError`].
///
/// A body that parses but does not fit the payload type is a
/// `VALIDATION_ERROR`; other rejections become `BAD_REQUEST`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
