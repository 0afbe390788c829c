use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::api::extract::ApiJson;
use crate::entities::tools;
use crate::services::tools::{CreateToolRequest, UpdateToolRequest};

#[derive(Serialize, ToSchema)]
pub struct DeleteToolResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/tools",
    responses(
        (status = 200, description = "All tools, oldest first", body = Vec<tools::Model>)
    ),
    tag = "tools"
)]
pub async fn list_tools(
    State(state): State<AppState>,
) -> Result<Json<Vec<tools::Model>>, AppError> {
    Ok(Json(state.tools.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/tools/{slug}",
    params(("slug" = String, Path, description = "Tool slug, case-insensitive")),
    responses(
        (status = 200, description = "Tool found", body = tools::Model),
        (status = 404, description = "Tool not found")
    ),
    tag = "tools"
)]
pub async fn get_tool(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<tools::Model>, AppError> {
    Ok(Json(state.tools.find_by_slug(&slug).await?))
}

#[utoipa::path(
    post,
    path = "/api/tools",
    request_body = CreateToolRequest,
    responses(
        (status = 201, description = "Tool created", body = tools::Model),
        (status = 400, description = "Invalid fields or duplicate slug")
    ),
    tag = "tools"
)]
pub async fn create_tool(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateToolRequest>,
) -> Result<(StatusCode, Json<tools::Model>), AppError> {
    let tool = state.tools.create(req).await?;
    Ok((StatusCode::CREATED, Json(tool)))
}

#[utoipa::path(
    put,
    path = "/api/tools/{id}",
    params(("id" = String, Path, description = "Tool id")),
    request_body = UpdateToolRequest,
    responses(
        (status = 200, description = "Tool updated", body = tools::Model),
        (status = 400, description = "Invalid fields or duplicate slug"),
        (status = 404, description = "Tool not found")
    ),
    tag = "tools"
)]
pub async fn update_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateToolRequest>,
) -> Result<Json<tools::Model>, AppError> {
    Ok(Json(state.tools.update(&id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tools/{id}",
    params(("id" = String, Path, description = "Tool id")),
    responses(
        (status = 200, description = "Tool deleted", body = DeleteToolResponse),
        (status = 404, description = "Tool not found")
    ),
    tag = "tools"
)]
pub async fn delete_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteToolResponse>, AppError> {
    state.tools.delete(&id).await?;
    Ok(Json(DeleteToolResponse {
        message: "Tool deleted successfully".to_string(),
    }))
}
