//! Commit entity - an immutable commit belonging to exactly one repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Commit model. The hash is globally unique, so each upstream commit maps to one row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning repository.
    pub repository_id: Uuid,
    /// Commit SHA.
    #[sea_orm(unique)]
    pub hash: String,
    pub author: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub url: String,
    /// Author date, normalized to UTC.
    pub committed_at: DateTimeWithTimeZone,
    /// When this row was written.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id"
    )]
    Repository,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}
