use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::commit::{Column, Entity as Commit, Model};

use super::errors::Result;

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (0-indexed).
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
}

impl Pagination {
    /// Create a new pagination with the given page and per_page values.
    ///
    /// The page is capped at [`MAX_PAGE`] so the row offset cannot overflow.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.min(MAX_PAGE),
            per_page: per_page.clamp(MIN_PER_PAGE, MAX_PER_PAGE),
        }
    }

    /// Build from a 1-based page number, as used by the HTTP API.
    pub fn from_one_based(page: u64, per_page: u64) -> Self {
        Self::new(page.saturating_sub(1), per_page)
    }
}

const MIN_PER_PAGE: u64 = 1;
const MAX_PER_PAGE: u64 = 100;

/// Highest page number a listing accepts.
pub const MAX_PAGE: u64 = 1_000_000;

/// Default page size for commit listings.
pub const DEFAULT_PER_PAGE: u64 = 20;

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Result of a paginated query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The items for the current page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number (0-indexed).
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

/// Commit count per author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub commits: i64,
}

// ─── Query Operations ────────────────────────────────────────────────────────

/// Commits of one repository, newest first.
pub async fn commits_by_repository(
    db: &DatabaseConnection,
    repository_id: Uuid,
    pagination: Pagination,
) -> Result<PaginatedResult<Model>> {
    let paginator = Commit::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_desc(Column::CommittedAt)
        .order_by_asc(Column::Hash)
        .paginate(db, pagination.per_page);

    let total = paginator.num_items().await?;
    let total_pages = paginator.num_pages().await?;
    let items = paginator.fetch_page(pagination.page).await?;

    Ok(PaginatedResult {
        items,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
        total_pages,
    })
}

/// Authors with the most commits, optionally scoped to one repository.
///
/// Ties are broken by author name so the order is stable.
pub async fn top_authors(
    db: &DatabaseConnection,
    limit: u64,
    repository_id: Option<Uuid>,
) -> Result<Vec<AuthorCount>> {
    let mut query = Commit::find()
        .select_only()
        .column(Column::Author)
        .column_as(Column::Id.count(), "commits")
        .group_by(Column::Author)
        .order_by_desc(Column::Id.count())
        .order_by_asc(Column::Author)
        .limit(limit);

    if let Some(repository_id) = repository_id {
        query = query.filter(Column::RepositoryId.eq(repository_id));
    }

    let rows = query.into_tuple::<(String, i64)>().all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(author, commits)| AuthorCount { author, commits })
        .collect())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, QueryTrait};

    use super::*;

    #[test]
    fn pagination_clamps_page_size() {
        assert_eq!(Pagination::new(0, 0).per_page, 1);
        assert_eq!(Pagination::new(0, 1000).per_page, 100);
        assert_eq!(Pagination::new(2, 20).per_page, 20);
    }

    #[test]
    fn pagination_from_one_based() {
        assert_eq!(Pagination::from_one_based(1, 20), Pagination::new(0, 20));
        assert_eq!(Pagination::from_one_based(3, 10).page, 2);
        assert_eq!(Pagination::from_one_based(0, 10).page, 0);
    }

    #[test]
    fn pagination_caps_page_number() {
        assert_eq!(Pagination::new(u64::MAX, 100).page, MAX_PAGE);
        assert_eq!(Pagination::from_one_based(u64::MAX, 100).page, MAX_PAGE);
        assert!(MAX_PAGE.checked_mul(MAX_PER_PAGE).is_some());
    }

    #[test]
    fn pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.page, 0);
        assert_eq!(p.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn top_authors_query_groups_and_orders() {
        let sql = Commit::find()
            .select_only()
            .column(Column::Author)
            .column_as(Column::Id.count(), "commits")
            .group_by(Column::Author)
            .order_by_desc(Column::Id.count())
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"GROUP BY "commits"."author""#), "{sql}");
        assert!(sql.contains(r#"ORDER BY COUNT("commits"."id") DESC"#), "{sql}");
    }
}
