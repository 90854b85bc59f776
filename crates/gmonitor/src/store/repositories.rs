use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};
use crate::platform::RemoteRepository;

use super::errors::{Result, StoreError};

// ─── Single Record Operations ────────────────────────────────────────────────

/// Insert a new repository.
///
/// # Errors
/// Returns `StoreError::Duplicate` if a repository with the same name exists
/// (including a soft-deleted one), `StoreError::Database` for anything else.
pub async fn insert(db: &DatabaseConnection, model: ActiveModel) -> Result<Model> {
    let name = match &model.name {
        sea_orm::ActiveValue::Set(name) | sea_orm::ActiveValue::Unchanged(name) => name.clone(),
        sea_orm::ActiveValue::NotSet => {
            return Err(StoreError::InvalidInput {
                message: "name is required".to_string(),
            });
        }
    };

    match model.insert(db).await.map_err(StoreError::from) {
        Ok(model) => Ok(model),
        Err(e) if e.is_unique_violation() => Err(StoreError::Duplicate { name }),
        Err(e) => Err(e),
    }
}

/// Find a tracked repository by its UUID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>> {
    Repository::find_by_id(id)
        .filter(Column::DeletedAt.is_null())
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Find a tracked repository by its full name (`owner/name`).
///
/// Soft-deleted repositories are treated as absent.
pub async fn find_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<Model>> {
    Repository::find()
        .filter(Column::Name.eq(name))
        .filter(Column::DeletedAt.is_null())
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Find a repository by name, including soft-deleted rows.
pub async fn find_by_name_with_deleted(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Model>> {
    Repository::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// List every tracked repository, ordered by name.
pub async fn find_all(db: &DatabaseConnection) -> Result<Vec<Model>> {
    Repository::find()
        .filter(Column::DeletedAt.is_null())
        .order_by_asc(Column::Name)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Overwrite the upstream-owned columns of an existing repository.
///
/// # Errors
/// Returns `StoreError::NotFound` if no tracked repository has this id.
pub async fn update_metadata(
    db: &DatabaseConnection,
    id: Uuid,
    remote: &RemoteRepository,
) -> Result<Model> {
    let existing = find_by_id(db, id)
        .await?
        .ok_or_else(|| StoreError::not_found_by_id(id))?;

    let mut model = remote.to_metadata_update();
    model.id = sea_orm::ActiveValue::Unchanged(existing.id);
    // Keep the stored name; upstream renames are not followed.
    model.name = sea_orm::ActiveValue::NotSet;
    model.update(db).await.map_err(StoreError::from)
}

/// Mark a repository as deleted. Its commits are kept.
///
/// # Errors
/// Returns `StoreError::NotFound` if no tracked repository has this name.
pub async fn soft_delete(db: &DatabaseConnection, name: &str) -> Result<Model> {
    let existing = find_by_name(db, name)
        .await?
        .ok_or_else(|| StoreError::not_found_by_name(name))?;

    let mut model: ActiveModel = existing.into();
    model.deleted_at = Set(Some(Utc::now().fixed_offset()));
    model.update(db).await.map_err(StoreError::from)
}
