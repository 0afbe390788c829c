use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::AppError;
use crate::api::extract::ApiJson;
use crate::services::converter;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HtmlToReactRequest {
    pub html_code: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HtmlToReactResponse {
    pub success: bool,
    pub react_code: String,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/converter/html-to-react",
    request_body = HtmlToReactRequest,
    responses(
        (status = 200, description = "HTML converted", body = HtmlToReactResponse),
        (status = 400, description = "HTML code is required")
    ),
    tag = "converter"
)]
pub async fn html_to_react(
    ApiJson(req): ApiJson<HtmlToReactRequest>,
) -> Result<Json<HtmlToReactResponse>, AppError> {
    let html = req
        .html_code
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("HTML code is required".to_string()))?;

    Ok(Json(HtmlToReactResponse {
        success: true,
        react_code: converter::html_to_react(&html),
        message: "HTML converted to React successfully".to_string(),
    }))
}
