use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::AppError;
use crate::api::extract::ApiJson;
use crate::services::mailer::ContactMessage;

#[derive(Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/contact/send-message",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Message delivered", body = ContactResponse),
        (status = 400, description = "Missing field or invalid email"),
        (status = 500, description = "Mail delivery failed")
    ),
    tag = "contact"
)]
pub async fn send_message(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    let contact = ContactMessage::new(req.name, req.email, req.subject, req.message)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .mailer
        .send_contact(&contact)
        .await
        .map_err(|e| AppError::upstream("Failed to send message", e))?;

    Ok(Json(ContactResponse {
        success: true,
        message: "Your message has been sent successfully!".to_string(),
    }))
}
