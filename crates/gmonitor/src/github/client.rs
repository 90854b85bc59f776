//! GitHub REST client for repository metadata and commit history.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use url::Url;

use super::convert::{to_remote_commit, to_remote_repository};
use super::error::GitHubError;
use super::types::{GitHubCommit, GitHubRepository};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{self, FetchClient, RemoteCommit, RemoteRepository};

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// REST API version pinned in every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Default cap on commit pages followed per fetch.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Maximum page size accepted by the commits endpoint.
const PAGE_SIZE: u32 = 100;

/// Extract the `rel="next"` URL from a GitHub `Link` header.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/repositories/1/commits?per_page=100&page=2>; rel="next", <...&page=5>; rel="last"`
pub fn parse_next_link(link_header: &str) -> Option<String> {
    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some("next")) = (url, rel) {
            return Some(url.to_string());
        }
    }

    None
}

/// GitHub API client implementing [`FetchClient`].
///
/// The credential is optional; unauthenticated requests work against public
/// repositories at a much lower rate limit.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    api_url: String,
    token: Option<String>,
    max_pages: u32,
}

impl GitHubClient {
    /// Create a client backed by reqwest.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GitHubClient::new(GITHUB_API_URL, Some(token), DEFAULT_HTTP_TIMEOUT)?;
    /// let repo = client.fetch_repository("rust-lang/rust").await?;
    /// ```
    pub fn new(
        api_url: &str,
        token: Option<String>,
        timeout: StdDuration,
    ) -> Result<Self, GitHubError> {
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| GitHubError::Config(e.to_string()))?;
        Ok(Self::new_with_transport(api_url, token, Arc::new(transport)))
    }

    pub fn new_with_transport(
        api_url: &str,
        token: Option<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Cap the number of commit pages followed per fetch (minimum 1).
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// URL of the repository metadata endpoint.
    pub fn repository_url(&self, name: &str) -> String {
        format!("{}/repos/{}", self.api_url, name)
    }

    /// URL of the first commits page for `name` since `since`.
    pub fn commits_url(&self, name: &str, since: DateTime<Utc>) -> Result<String, GitHubError> {
        let mut url = Url::parse(&format!("{}/repos/{}/commits", self.api_url, name))
            .map_err(|e| GitHubError::Config(format!("invalid API URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("per_page", &PAGE_SIZE.to_string());
        Ok(url.to_string())
    }

    fn request(&self, url: &str) -> HttpRequest {
        let request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", concat!("gmonitor/", env!("CARGO_PKG_VERSION")));

        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Make a GET request, failing on any non-2xx status.
    async fn get(&self, url: &str) -> Result<HttpResponse, GitHubError> {
        let response = self
            .transport
            .send(self.request(url))
            .await
            .map_err(|e| GitHubError::Http(e.to_string()))?;

        if !response.is_success() {
            tracing::debug!(
                status = response.status,
                url,
                body = %String::from_utf8_lossy(&response.body),
                "GitHub request failed"
            );
            return Err(GitHubError::Api {
                status: response.status,
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, HttpResponse), GitHubError> {
        let response = self.get(url).await?;
        let data = serde_json::from_slice(&response.body)?;
        Ok((data, response))
    }

    /// Fetch repository metadata.
    pub async fn get_repository(&self, name: &str) -> Result<GitHubRepository, GitHubError> {
        let (repo, _) = self.get_json(&self.repository_url(name)).await?;
        Ok(repo)
    }

    /// Fetch every commit since `since`, following pagination.
    ///
    /// Fails with [`GitHubError::Truncated`] when more than `max_pages` pages
    /// are on offer; nothing is returned in that case.
    pub async fn list_commits(
        &self,
        name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<GitHubCommit>, GitHubError> {
        let mut commits = Vec::new();
        let mut next = Some(self.commits_url(name, since)?);
        let mut pages = 0u32;

        while let Some(url) = next.take() {
            let (page, response): (Vec<GitHubCommit>, _) = self.get_json(&url).await?;
            commits.extend(page);
            pages += 1;

            next = response.header("link").and_then(parse_next_link);
            if next.is_some() && pages >= self.max_pages {
                tracing::warn!(
                    repo = name,
                    pages,
                    fetched = commits.len(),
                    "Commit listing exceeds the page cap; discarding partial fetch"
                );
                return Err(GitHubError::Truncated { pages });
            }
        }

        Ok(commits)
    }
}

#[async_trait]
impl FetchClient for GitHubClient {
    async fn fetch_repository(&self, name: &str) -> platform::Result<RemoteRepository> {
        let repo = self.get_repository(name).await?;
        Ok(to_remote_repository(repo))
    }

    async fn fetch_commits(
        &self,
        name: &str,
        since: DateTime<Utc>,
    ) -> platform::Result<Vec<RemoteCommit>> {
        let commits = self.list_commits(name, since).await?;
        let commits = commits
            .into_iter()
            .map(to_remote_commit)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, header_get};
    use crate::platform::FetchError;
    use chrono::TimeZone;

    const API: &str = "https://github.test/api";

    fn client(transport: &MockTransport, token: Option<&str>) -> GitHubClient {
        GitHubClient::new_with_transport(
            API,
            token.map(String::from),
            Arc::new(transport.clone()),
        )
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap()
    }

    fn commit_json(sha: &str) -> serde_json::Value {
        serde_json::json!({
            "sha": sha,
            "html_url": format!("https://github.com/acme/widgets/commit/{sha}"),
            "commit": {
                "message": format!("commit {sha}"),
                "author": {"name": "Alice", "date": "2024-02-01T00:00:00Z"},
                "committer": {"name": "Alice", "date": "2024-02-01T00:00:00Z"}
            }
        })
    }

    fn response(status: u16, headers: Vec<(&str, &str)>, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://api.github.com/repositories/1/commits?page=2>; rel="next", <https://api.github.com/repositories/1/commits?page=5>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/repositories/1/commits?page=2")
        );
    }

    #[test]
    fn test_parse_next_link_on_last_page() {
        let header = r#"<https://api.github.com/repositories/1/commits?page=1>; rel="prev", <https://api.github.com/repositories/1/commits?page=1>; rel="first""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
    }

    #[test]
    fn test_new_normalizes_api_url_and_blank_token() {
        let transport = MockTransport::new();
        let client = GitHubClient::new_with_transport(
            "https://github.test/api///",
            Some("  ".to_string()),
            Arc::new(transport),
        );
        assert_eq!(client.api_url(), "https://github.test/api");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_commits_url_encodes_since() {
        let transport = MockTransport::new();
        let url = client(&transport, None)
            .commits_url("acme/widgets", since())
            .unwrap();
        assert_eq!(
            url,
            "https://github.test/api/repos/acme/widgets/commits?since=2024-01-01T00%3A00%3A01Z&per_page=100"
        );
    }

    #[test]
    fn test_client_is_fetch_client() {
        fn assert_fetch_client<T: FetchClient + Clone>() {}
        assert_fetch_client::<GitHubClient>();
    }

    #[tokio::test]
    async fn fetch_repository_sends_headers_and_converts() {
        let transport = MockTransport::new();
        transport.push_json(
            format!("{API}/repos/acme/widgets"),
            &serde_json::json!({
                "full_name": "acme/widgets",
                "description": "Widgets",
                "html_url": "https://github.com/acme/widgets",
                "language": "Rust",
                "forks_count": 1,
                "stargazers_count": 2,
                "open_issues_count": 3,
                "watchers_count": 2,
                "created_at": "2020-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            }),
        );

        let repo = client(&transport, Some("secret"))
            .fetch_repository("acme/widgets")
            .await
            .expect("repository");
        assert_eq!(repo.full_name, "acme/widgets");
        assert_eq!(repo.stars, 2);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;
        assert_eq!(header_get(headers, "authorization"), Some("Bearer secret"));
        assert_eq!(
            header_get(headers, "accept"),
            Some("application/vnd.github+json")
        );
        assert_eq!(
            header_get(headers, "x-github-api-version"),
            Some(GITHUB_API_VERSION)
        );
        assert!(header_get(headers, "user-agent").is_some());
    }

    #[tokio::test]
    async fn unauthenticated_client_sends_no_authorization() {
        let transport = MockTransport::new();
        let client = client(&transport, None);
        transport.push_json(
            client.commits_url("acme/widgets", since()).unwrap(),
            &serde_json::json!([]),
        );

        let commits = client.fetch_commits("acme/widgets", since()).await.unwrap();
        assert!(commits.is_empty());
        assert_eq!(header_get(&transport.requests()[0].headers, "authorization"), None);
    }

    #[tokio::test]
    async fn fetch_commits_follows_next_links() {
        let transport = MockTransport::new();
        let client = client(&transport, None);
        let first = client.commits_url("acme/widgets", since()).unwrap();
        let second = format!("{API}/repositories/1/commits?page=2");

        transport.push_response(
            HttpMethod::Get,
            first,
            response(
                200,
                vec![("Link", format!(r#"<{second}>; rel="next""#).as_str())],
                serde_json::json!([commit_json("h1"), commit_json("h2")]),
            ),
        );
        transport.push_response(
            HttpMethod::Get,
            second,
            response(200, vec![], serde_json::json!([commit_json("h3")])),
        );

        let commits = client.fetch_commits("acme/widgets", since()).await.unwrap();
        let hashes: Vec<_> = commits.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["h1", "h2", "h3"]);
    }

    #[tokio::test]
    async fn fetch_commits_fails_when_page_cap_is_exceeded() {
        let transport = MockTransport::new();
        let client = client(&transport, None).with_max_pages(1);
        let first = client.commits_url("acme/widgets", since()).unwrap();

        transport.push_response(
            HttpMethod::Get,
            first,
            response(
                200,
                vec![("Link", format!(r#"<{API}/next>; rel="next""#).as_str())],
                serde_json::json!([commit_json("h1")]),
            ),
        );

        let err = client
            .fetch_commits("acme/widgets", since())
            .await
            .expect_err("partial listing must not succeed");
        assert!(matches!(err, FetchError::Truncated { pages: 1 }), "{err:?}");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn non_success_status_is_status_error() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{API}/repos/acme/missing"),
            response(404, vec![], serde_json::json!({"message": "Not Found"})),
        );

        let err = client(&transport, None)
            .fetch_repository("acme/missing")
            .await
            .expect_err("404");
        assert!(err.is_not_found(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn malformed_payload_is_decode_error() {
        let transport = MockTransport::new();
        let client = client(&transport, None);
        transport.push_json(
            client.commits_url("acme/widgets", since()).unwrap(),
            &serde_json::json!({"unexpected": "object"}),
        );

        let err = client
            .fetch_commits("acme/widgets", since())
            .await
            .expect_err("decode");
        assert!(matches!(err, FetchError::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn transport_failure_is_transport_error() {
        let transport = MockTransport::new();
        transport.push_transport_error(format!("{API}/repos/acme/widgets"), "dns failure");

        let err = client(&transport, None)
            .fetch_repository("acme/widgets")
            .await
            .expect_err("transport");
        assert!(matches!(err, FetchError::Transport { .. }), "{err:?}");
    }
}
