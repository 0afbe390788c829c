use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::error::AppError;
use crate::entities::prelude::*;
use crate::entities::tools::{self, ToolCategory};

pub const DEFAULT_TOOL_ICON: &str = "default-tool-icon.png";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateToolRequest {
    #[validate(required(message = "Tool name is required"))]
    pub name: Option<String>,
    #[validate(required(message = "Tool description is required"))]
    pub description: Option<String>,
    #[validate(required(message = "Tool category is required"))]
    pub category: Option<String>,
    pub icon: Option<String>,
    #[validate(required(message = "Tool slug is required"))]
    pub slug: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateToolRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
    pub slug: Option<String>,
    pub is_active: Option<bool>,
}

/// Fully-resolved field values, checked and normalised.
struct ToolFields {
    name: String,
    description: String,
    category: ToolCategory,
    icon: String,
    slug: String,
    is_active: bool,
}

impl ToolFields {
    fn resolve(
        name: &str,
        description: &str,
        category: &str,
        icon: Option<&str>,
        slug: &str,
        is_active: bool,
    ) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Tool name is required".to_string()));
        }
        if description.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Tool description is required".to_string(),
            ));
        }
        let category = ToolCategory::parse(category.trim()).ok_or_else(|| {
            AppError::BadRequest(format!(
                "`{}` is not a valid category (expected one of PDF, Image, Audio, Video, Converter, Other)",
                category
            ))
        })?;
        let slug = slug.trim().to_lowercase();
        if slug.is_empty() {
            return Err(AppError::BadRequest("Tool slug is required".to_string()));
        }
        let icon = icon
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_TOOL_ICON)
            .to_string();

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            category,
            icon,
            slug,
            is_active,
        })
    }
}

fn map_unique_violation(err: DbErr, slug: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_slug(slug),
        _ => AppError::Database(err),
    }
}

fn duplicate_slug(slug: &str) -> AppError {
    AppError::BadRequest(format!("A tool with slug '{}' already exists", slug))
}

pub struct ToolService {
    db: DatabaseConnection,
}

impl ToolService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<tools::Model>, AppError> {
        let all = Tools::find()
            .order_by_asc(tools::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(all)
    }

    /// Slugs are stored lowercased, so lookups lowercase the key.
    pub async fn find_by_slug(&self, slug: &str) -> Result<tools::Model, AppError> {
        Tools::find()
            .filter(tools::Column::Slug.eq(slug.trim().to_lowercase()))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Tool not found".to_string()))
    }

    async fn ensure_slug_free(&self, slug: &str, except_id: Option<&str>) -> Result<(), AppError> {
        let mut query = Tools::find().filter(tools::Column::Slug.eq(slug));
        if let Some(id) = except_id {
            query = query.filter(tools::Column::Id.ne(id));
        }
        if query.one(&self.db).await?.is_some() {
            return Err(duplicate_slug(slug));
        }
        Ok(())
    }

    pub async fn create(&self, req: CreateToolRequest) -> Result<tools::Model, AppError> {
        req.validate()?;

        let fields = ToolFields::resolve(
            req.name.as_deref().unwrap_or_default(),
            req.description.as_deref().unwrap_or_default(),
            req.category.as_deref().unwrap_or_default(),
            req.icon.as_deref(),
            req.slug.as_deref().unwrap_or_default(),
            req.is_active.unwrap_or(true),
        )?;
        self.ensure_slug_free(&fields.slug, None).await?;

        let now = Utc::now();
        let tool = tools::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(fields.name),
            description: Set(fields.description),
            category: Set(fields.category),
            icon: Set(fields.icon),
            slug: Set(fields.slug.clone()),
            is_active: Set(fields.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = tool
            .insert(&self.db)
            .await
            .map_err(|e| map_unique_violation(e, &fields.slug))?;
        info!("Created tool {} ({})", created.slug, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, req: UpdateToolRequest) -> Result<tools::Model, AppError> {
        let existing = Tools::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Tool not found".to_string()))?;

        let fields = ToolFields::resolve(
            req.name.as_deref().unwrap_or(&existing.name),
            req.description.as_deref().unwrap_or(&existing.description),
            req.category
                .as_deref()
                .unwrap_or(existing.category.as_str()),
            Some(req.icon.as_deref().unwrap_or(&existing.icon)),
            req.slug.as_deref().unwrap_or(&existing.slug),
            req.is_active.unwrap_or(existing.is_active),
        )?;
        self.ensure_slug_free(&fields.slug, Some(id)).await?;

        let mut tool: tools::ActiveModel = existing.into();
        tool.name = Set(fields.name);
        tool.description = Set(fields.description);
        tool.category = Set(fields.category);
        tool.icon = Set(fields.icon);
        tool.slug = Set(fields.slug.clone());
        tool.is_active = Set(fields.is_active);
        tool.updated_at = Set(Utc::now());

        let updated = tool
            .update(&self.db)
            .await
            .map_err(|e| map_unique_violation(e, &fields.slug))?;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = Tools::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Tool not found".to_string()));
        }
        info!("Deleted tool {}", id);
        Ok(())
    }
}
