use axum::extract::FromRequest;

use crate::api::error::AppError;

/// JSON body extractor whose rejections render as `AppError` envelopes.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
