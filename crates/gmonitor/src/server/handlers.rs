use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::AppState;
use super::response::{ApiError, ApiResult, Envelope};
use crate::cache::{get_json, set_json};
use crate::entity::commit::Model as CommitModel;
use crate::entity::repository::Model as RepositoryModel;
use crate::store::query::{self, DEFAULT_PER_PAGE, MAX_PAGE};
use crate::store::{AuthorCount, PaginatedResult, Pagination, repositories};
use crate::tracker::{TrackedRepository, track_repository};

// ─── Request Types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorsQuery {
    pub limit: Option<i64>,
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommitsQuery {
    pub repo: Option<String>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn required_repo(repo: Option<String>) -> ApiResult<String> {
    repo.map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: repo".to_string()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query
        .map(|Query(q)| q)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Look up a tracked repository through the cache.
async fn find_repository(state: &AppState, name: &str) -> ApiResult<RepositoryModel> {
    if let Some(cached) = get_json::<RepositoryModel>(state.cache.as_ref(), name).await {
        return Ok(cached);
    }

    let repository = repositories::find_by_name(&state.db, name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Repository not tracked: {name}")))?;

    set_json(state.cache.as_ref(), name, &repository, state.cache_ttl).await;
    Ok(repository)
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// POST /api/v1/repos
pub async fn create_repository(
    State(state): State<AppState>,
    payload: Result<Json<CreateRepositoryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<TrackedRepository>>)> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let owner = request.owner.trim();
    let repo = request.repo.trim();
    if owner.is_empty() || repo.is_empty() {
        return Err(ApiError::BadRequest(
            "Both owner and repo are required".to_string(),
        ));
    }

    let name = format!("{owner}/{repo}");
    let since = request.since.unwrap_or(state.epoch);
    let tracked = track_repository(&state.db, state.client.as_ref(), &name, since).await?;

    set_json(
        state.cache.as_ref(),
        &tracked.repository.name,
        &tracked.repository,
        state.cache_ttl,
    )
    .await;

    Ok((StatusCode::CREATED, Json(Envelope::ok(tracked))))
}

/// GET /api/v1/repos?repo=owner/name
pub async fn get_repository(
    State(state): State<AppState>,
    query: Result<Query<RepoQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<RepositoryModel>>> {
    let name = required_repo(query_params(query)?.repo)?;
    let repository = find_repository(&state, &name).await?;
    Ok(Json(Envelope::ok(repository)))
}

/// GET /api/v1/repos/commit-authors?limit=N[&repo=owner/name]
pub async fn commit_authors(
    State(state): State<AppState>,
    query: Result<Query<AuthorsQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<AuthorCount>>>> {
    let params = query_params(query)?;
    let limit = match params.limit {
        Some(limit) if limit > 0 => limit as u64,
        _ => {
            return Err(ApiError::BadRequest(
                "limit must be a positive integer".to_string(),
            ));
        }
    };

    let repo = params
        .repo
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let key = format!("{}_authors_{limit}", repo.as_deref().unwrap_or("*"));

    if let Some(cached) = get_json::<Vec<AuthorCount>>(state.cache.as_ref(), &key).await {
        return Ok(Json(Envelope::ok(cached)));
    }

    let repository_id = match &repo {
        Some(name) => Some(find_repository(&state, name).await?.id),
        None => None,
    };

    let authors = query::top_authors(&state.db, limit, repository_id).await?;
    set_json(state.cache.as_ref(), &key, &authors, state.cache_ttl).await;
    Ok(Json(Envelope::ok(authors)))
}

/// GET /api/v1/repos/commits?repo=owner/name&page=1&size=20
pub async fn list_commits(
    State(state): State<AppState>,
    query: Result<Query<CommitsQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<PaginatedResult<CommitModel>>>> {
    let params = query_params(query)?;
    let name = required_repo(params.repo)?;
    let page = params.page.unwrap_or(1).max(1);
    if page > MAX_PAGE {
        return Err(ApiError::BadRequest(format!(
            "page must not exceed {MAX_PAGE}"
        )));
    }
    let size = params.size.unwrap_or(DEFAULT_PER_PAGE);
    let pagination = Pagination::from_one_based(page, size);

    let key = format!("{name}_commits_{}_{page}", pagination.per_page);
    if let Some(cached) = get_json::<PaginatedResult<CommitModel>>(state.cache.as_ref(), &key).await {
        return Ok(Json(Envelope::ok(cached)));
    }

    let repository = find_repository(&state, &name).await?;
    let mut commits = query::commits_by_repository(&state.db, repository.id, pagination).await?;
    // Report the page number the caller used.
    commits.page = page;

    set_json(state.cache.as_ref(), &key, &commits, state.cache_ttl).await;
    Ok(Json(Envelope::ok(commits)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::platform::{FetchClient, FetchError, RemoteCommit, RemoteRepository};
    use crate::server::router;

    struct Unreachable;

    #[async_trait]
    impl FetchClient for Unreachable {
        async fn fetch_repository(&self, name: &str) -> crate::platform::Result<RemoteRepository> {
            Err(FetchError::transport(format!("unreachable: {name}")))
        }

        async fn fetch_commits(
            &self,
            name: &str,
            _since: DateTime<Utc>,
        ) -> crate::platform::Result<Vec<RemoteCommit>> {
            Err(FetchError::transport(format!("unreachable: {name}")))
        }
    }

    fn state() -> AppState {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        AppState::new(Arc::new(db), Arc::new(Unreachable), Arc::new(MemoryCache::default()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = router(state()).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn get_repository_requires_repo() {
        let (status, body) = send(get("/api/v1/repos")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("repo"));
    }

    #[tokio::test]
    async fn commits_require_repo() {
        let (status, _) = send(get("/api/v1/repos/commits?page=2")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn commits_reject_page_beyond_limit() {
        for uri in [
            "/api/v1/repos/commits?repo=acme/widgets&page=18446744073709551615",
            "/api/v1/repos/commits?repo=acme/widgets&page=1000001",
        ] {
            let (status, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], false, "{uri}");
        }
    }

    #[tokio::test]
    async fn authors_reject_non_positive_limit() {
        for uri in [
            "/api/v1/repos/commit-authors",
            "/api/v1/repos/commit-authors?limit=0",
            "/api/v1/repos/commit-authors?limit=-3",
            "/api/v1/repos/commit-authors?limit=ten",
        ] {
            let (status, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], false, "{uri}");
        }
    }

    #[tokio::test]
    async fn create_rejects_malformed_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/repos")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"owner": "acme"}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn create_rejects_blank_names() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/repos")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"owner": " ", "repo": "widgets"}"#))
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
