//! Repository entity - a tracked upstream repository and its last known metadata.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repository model - one row per tracked `owner/name`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Full name in `owner/name` form. Unique.
    #[sea_orm(unique)]
    pub name: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    /// Repository description.
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Web URL of the repository.
    pub url: String,
    /// Primary programming language.
    pub language: Option<String>,

    // ─── Statistics ──────────────────────────────────────────────────────────
    pub forks: i32,
    pub stars: i32,
    pub open_issues: i32,
    pub watchers: i32,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    /// When the repository was created upstream.
    pub created_at: DateTimeWithTimeZone,
    /// When the repository was last updated upstream.
    pub updated_at: DateTimeWithTimeZone,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// When the metadata above was last fetched.
    pub synced_at: DateTimeWithTimeZone,
    /// Soft-delete marker. Deleted repositories are no longer synced.
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::commit::Entity")]
    Commits,
}

impl Related<super::commit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Split the full name into `(owner, name)`.
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        self.name.split_once('/')
    }

    /// Whether the repository has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
