use chrono::{DateTime, Utc};
use sea_orm::Set;
use uuid::Uuid;

use crate::entity::commit::ActiveModel as CommitActiveModel;
use crate::entity::repository::ActiveModel as RepositoryActiveModel;

use super::types::{RemoteCommit, RemoteRepository};

/// Saturating conversion for upstream counters.
fn count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl RemoteRepository {
    /// Convert to a new database row.
    pub fn to_active_model(&self) -> RepositoryActiveModel {
        RepositoryActiveModel {
            id: Set(Uuid::new_v4()),
            deleted_at: Set(None),
            ..self.to_metadata_update()
        }
    }

    /// Active model carrying only the upstream-owned columns, for refreshing an
    /// existing row without touching its identity or soft-delete state.
    pub fn to_metadata_update(&self) -> RepositoryActiveModel {
        RepositoryActiveModel {
            name: Set(self.full_name.clone()),
            description: Set(self.description.clone()),
            url: Set(self.url.clone()),
            language: Set(self.language.clone()),
            forks: Set(count(self.forks)),
            stars: Set(count(self.stars)),
            open_issues: Set(count(self.open_issues)),
            watchers: Set(count(self.watchers)),
            created_at: Set(self.created_at.fixed_offset()),
            updated_at: Set(self.updated_at.fixed_offset()),
            synced_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
    }
}

impl RemoteCommit {
    /// Convert to a database row owned by `repository_id`.
    ///
    /// The commit date is normalized to UTC so stored timestamps order correctly
    /// on every backend.
    pub fn to_active_model(&self, repository_id: Uuid, synced_at: DateTime<Utc>) -> CommitActiveModel {
        CommitActiveModel {
            id: Set(Uuid::new_v4()),
            repository_id: Set(repository_id),
            hash: Set(self.hash.clone()),
            author: Set(self.author.clone()),
            message: Set(self.message.clone()),
            url: Set(self.url.clone()),
            committed_at: Set(self.committed_at.fixed_offset()),
            synced_at: Set(synced_at.fixed_offset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::ActiveValue;

    use super::*;

    fn remote_repo() -> RemoteRepository {
        RemoteRepository {
            full_name: "acme/widgets".to_string(),
            description: Some("Widgets".to_string()),
            url: "https://github.com/acme/widgets".to_string(),
            language: Some("Rust".to_string()),
            forks: 3,
            stars: u32::MAX,
            open_issues: 1,
            watchers: 7,
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn repository_conversion_sets_identity_and_counts() {
        let model = remote_repo().to_active_model();
        assert!(matches!(model.id, ActiveValue::Set(_)));
        assert_eq!(model.name, Set("acme/widgets".to_string()));
        assert_eq!(model.forks, Set(3));
        assert_eq!(model.stars, Set(i32::MAX), "counts saturate");
        assert_eq!(model.deleted_at, Set(None));
    }

    #[test]
    fn metadata_update_leaves_identity_unset() {
        let model = remote_repo().to_metadata_update();
        assert!(matches!(model.id, ActiveValue::NotSet));
        assert!(matches!(model.deleted_at, ActiveValue::NotSet));
        assert_eq!(model.watchers, Set(7));
    }

    #[test]
    fn commit_conversion_tags_repository_and_keeps_utc() {
        let repository_id = Uuid::new_v4();
        let committed_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let commit = RemoteCommit {
            hash: "a".repeat(40),
            author: "alice".to_string(),
            message: "init".to_string(),
            url: "https://github.com/acme/widgets/commit/aaa".to_string(),
            committed_at,
        };
        let model = commit.to_active_model(repository_id, Utc::now());
        assert_eq!(model.repository_id, Set(repository_id));
        assert_eq!(model.hash, Set("a".repeat(40)));
        assert_eq!(model.committed_at, Set(committed_at.fixed_offset()));
    }
}
