use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ToolCategory {
    #[sea_orm(string_value = "PDF")]
    #[serde(rename = "PDF")]
    Pdf,
    #[sea_orm(string_value = "Image")]
    Image,
    #[sea_orm(string_value = "Audio")]
    Audio,
    #[sea_orm(string_value = "Video")]
    Video,
    #[sea_orm(string_value = "Converter")]
    Converter,
    #[sea_orm(string_value = "Other")]
    Other,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 6] = [
        ToolCategory::Pdf,
        ToolCategory::Image,
        ToolCategory::Audio,
        ToolCategory::Video,
        ToolCategory::Converter,
        ToolCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Pdf => "PDF",
            ToolCategory::Image => "Image",
            ToolCategory::Audio => "Audio",
            ToolCategory::Video => "Video",
            ToolCategory::Converter => "Converter",
            ToolCategory::Other => "Other",
        }
    }

    /// Exact, case-sensitive match on the stored label.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "tools")]
#[serde(rename_all = "camelCase")]
#[schema(as = Tool)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: ToolCategory,
    pub icon: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
