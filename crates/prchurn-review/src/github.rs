use chrono::{DateTime, Utc};
use prchurn_core::{BlameEntry, ChurnError, Interval, PrFile, RepoRef};
use serde::{Deserialize, Serialize};

/// Pages of 100 files; GitHub stops listing PR files at 3000.
const PER_PAGE: u8 = 100;
const MAX_PAGES: u32 = 30;

const BLAME_QUERY: &str = r#"
query($owner: String!, $name: String!, $expression: String!, $path: String!) {
  repository(owner: $owner, name: $name) {
    object(expression: $expression) {
      ... on Commit {
        blame(path: $path) {
          ranges {
            commit {
              committedDate
            }
            startingLine
            endingLine
          }
        }
      }
    }
  }
}
"#;

/// GitHub client for the three lookups a churn run needs: the files of a
/// pull request, the blame of a file on a branch, and the contributor list.
///
/// REST calls go through octocrab; the GraphQL blame query is posted with
/// reqwest so HTTP status and GraphQL errors can be reported separately.
///
/// # Examples
///
/// ```no_run
/// use prchurn_core::RepoRef;
/// use prchurn_review::github::GitHubClient;
///
/// let repo: RepoRef = "octocat/hello-world".parse().unwrap();
/// let client = GitHubClient::new("ghp_xxxx", "https://api.github.com", repo).unwrap();
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
    graphql_url: String,
    repo: RepoRef,
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Deserialize)]
struct Contributor {
    login: String,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct BlameData {
    repository: Option<RepositoryNode>,
}

#[derive(Deserialize)]
struct RepositoryNode {
    object: Option<CommitNode>,
}

#[derive(Deserialize)]
struct CommitNode {
    blame: Option<BlameNode>,
}

#[derive(Deserialize)]
struct BlameNode {
    ranges: Vec<BlameRange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlameRange {
    commit: BlameCommit,
    starting_line: u32,
    ending_line: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlameCommit {
    committed_date: DateTime<Utc>,
}

impl GitHubClient {
    /// Create a client for `repo` against the REST root `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] if `api_url` is not a valid URI, or
    /// [`ChurnError::GitHub`] if the client cannot be built.
    pub fn new(token: &str, api_url: &str, repo: RepoRef) -> Result<Self, ChurnError> {
        let api_url = api_url.trim_end_matches('/');

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_url)
            .map_err(|e| ChurnError::Config(format!("invalid GitHub API URL '{api_url}': {e}")))?
            .build()
            .map_err(|e| ChurnError::GitHub(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            http: reqwest::Client::new(),
            token: token.to_string(),
            graphql_url: graphql_endpoint(api_url),
            repo,
        })
    }

    /// Repository this client reads from.
    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// List every file a pull request touches, following pagination.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::GitHub`] on network or API errors. A failure
    /// on any page fails the whole listing.
    pub async fn fetch_pr_files(&self, pr_number: u64) -> Result<Vec<PrFile>, ChurnError> {
        let route = format!(
            "/repos/{}/{}/pulls/{pr_number}/files",
            self.repo.owner, self.repo.repo
        );
        let files: Vec<PrFile> = self.get_all_pages(&route).await.map_err(|e| {
            ChurnError::GitHub(format!("failed to list files of PR #{pr_number}: {e}"))
        })?;
        tracing::debug!(pr = pr_number, files = files.len(), "fetched PR files");
        Ok(files)
    }

    /// Logins of the repository's contributors.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::GitHub`] on network or API errors.
    pub async fn list_contributors(&self) -> Result<Vec<String>, ChurnError> {
        let route = format!("/repos/{}/{}/contributors", self.repo.owner, self.repo.repo);
        let contributors: Vec<Contributor> = self
            .get_all_pages(&route)
            .await
            .map_err(|e| ChurnError::GitHub(format!("failed to list contributors: {e}")))?;
        Ok(contributors.into_iter().map(|c| c.login).collect())
    }

    /// Blame ranges of `path` at the tip of `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::GitHub`] for non-success HTTP statuses, GraphQL
    /// errors, or a branch or file that does not resolve.
    pub async fn fetch_blame_ranges(
        &self,
        path: &str,
        branch: &str,
    ) -> Result<Vec<BlameEntry>, ChurnError> {
        let body = serde_json::json!({
            "query": BLAME_QUERY,
            "variables": {
                "owner": self.repo.owner,
                "name": self.repo.repo,
                "expression": branch,
                "path": path,
            },
        });

        let response = self
            .http
            .post(&self.graphql_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "prchurn")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChurnError::GitHub(format!("failed to fetch blame for {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChurnError::GitHub(format!(
                "GitHub API error {status} blaming {path}: {body}"
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ChurnError::GitHub(format!("failed to read blame response: {e}")))?;
        let entries = parse_blame_response(&text, path, branch)?;
        tracing::debug!(file = path, branch, ranges = entries.len(), "fetched blame");
        Ok(entries)
    }

    async fn get_all_pages<T>(&self, route: &str) -> Result<Vec<T>, octocrab::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let params = PageParams {
                per_page: PER_PAGE,
                page,
            };
            let batch: Vec<T> = self.octocrab.get(route, Some(&params)).await?;
            let done = batch.len() < usize::from(PER_PAGE);
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }
}

/// GraphQL endpoint for a REST root: `https://api.github.com/graphql` for
/// github.com, `https://host/api/graphql` for GitHub Enterprise Server
/// (`https://host/api/v3`).
///
/// # Examples
///
/// ```
/// use prchurn_review::github::graphql_endpoint;
///
/// assert_eq!(graphql_endpoint("https://api.github.com"), "https://api.github.com/graphql");
/// assert_eq!(graphql_endpoint("https://ghe.corp/api/v3/"), "https://ghe.corp/api/graphql");
/// ```
pub fn graphql_endpoint(api_url: &str) -> String {
    let root = api_url.trim_end_matches('/');
    match root.strip_suffix("/v3") {
        Some(base) => format!("{base}/graphql"),
        None => format!("{root}/graphql"),
    }
}

/// Turn a GraphQL blame response body into blame entries.
///
/// # Errors
///
/// Returns [`ChurnError::GitHub`] if the response carries GraphQL errors or
/// the branch does not resolve to a commit, and [`ChurnError::Parse`] for
/// bodies that are not the expected shape or ranges with reversed bounds.
pub fn parse_blame_response(
    body: &str,
    path: &str,
    branch: &str,
) -> Result<Vec<BlameEntry>, ChurnError> {
    let response: GraphQlResponse<BlameData> = serde_json::from_str(body)
        .map_err(|e| ChurnError::Parse(format!("unexpected blame response for {path}: {e}")))?;

    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(ChurnError::GitHub(format!(
            "blame query for {path} failed: {}",
            messages.join("; ")
        )));
    }

    let repository = response
        .data
        .and_then(|d| d.repository)
        .ok_or_else(|| ChurnError::GitHub(format!("repository not found while blaming {path}")))?;
    let blame = repository
        .object
        .and_then(|o| o.blame)
        .ok_or_else(|| ChurnError::GitHub(format!("branch '{branch}' does not resolve to a commit")))?;

    blame
        .ranges
        .into_iter()
        .map(|r| -> Result<BlameEntry, ChurnError> {
            Ok(BlameEntry {
                range: Interval::try_new(r.starting_line, r.ending_line)?,
                committed_date: r.commit.committed_date,
            })
        })
        .collect()
}

/// Find a GitHub token: `explicit`, then `GITHUB_TOKEN`, then `GH_TOKEN`,
/// then `gh auth token`.
///
/// # Errors
///
/// Returns [`ChurnError::Config`] if none of them yields a token.
pub fn resolve_token(explicit: Option<&str>) -> Result<String, ChurnError> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Ok(token.to_string());
    }
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var) {
            if !token.is_empty() {
                tracing::debug!(source = var, "using GitHub token from environment");
                return Ok(token);
            }
        }
    }
    if let Some(token) = gh_cli_token() {
        tracing::debug!(source = "gh", "using GitHub token from gh CLI");
        return Ok(token);
    }
    Err(ChurnError::Config(
        "no GitHub token found. Pass --github-token, set GITHUB_TOKEN or GH_TOKEN, or run `gh auth login`"
            .into(),
    ))
}

fn gh_cli_token() -> Option<String> {
    let output = std::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8(output.stdout).ok()?.trim().to_string();
    (!token.is_empty()).then_some(token)
}

/// Parse a PR reference in `owner/repo#number` format.
///
/// # Errors
///
/// Returns [`ChurnError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use prchurn_review::github::parse_pr_reference;
///
/// let (repo, number) = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(repo.owner, "octocat");
/// assert_eq!(repo.repo, "hello-world");
/// assert_eq!(number, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<(RepoRef, u64), ChurnError> {
    let invalid =
        || ChurnError::Config(format!("invalid PR reference '{pr_ref}', expected owner/repo#number"));

    let (owner_repo, number) = pr_ref.split_once('#').ok_or_else(invalid)?;
    let repo: RepoRef = owner_repo.parse().map_err(|_| invalid())?;
    let number: u64 = number.parse().map_err(|_| invalid())?;
    Ok((repo, number))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn blame_response_is_parsed() {
        let body = r#"{
          "data": {
            "repository": {
              "object": {
                "blame": {
                  "ranges": [
                    {"commit": {"committedDate": "2024-05-01T10:00:00Z"}, "startingLine": 1, "endingLine": 4},
                    {"commit": {"committedDate": "2023-01-15T23:30:00Z"}, "startingLine": 5, "endingLine": 5}
                  ]
                }
              }
            }
          }
        }"#;
        let entries = parse_blame_response(body, "src/lib.rs", "main").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].range, Interval::new(1, 4));
        assert_eq!(
            entries[0].committed_date,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(entries[1].range, Interval::new(5, 5));
    }

    #[test]
    fn offset_dates_are_normalised_to_utc() {
        let body = r#"{"data":{"repository":{"object":{"blame":{"ranges":[
            {"commit":{"committedDate":"2024-05-01T23:30:00-02:00"},"startingLine":1,"endingLine":1}
        ]}}}}}"#;
        let entries = parse_blame_response(body, "a", "main").unwrap();
        assert_eq!(
            entries[0].committed_date,
            Utc.with_ymd_and_hms(2024, 5, 2, 1, 30, 0).unwrap()
        );
    }

    #[test]
    fn graphql_errors_are_reported() {
        let body = r#"{
          "data": {"repository": {"object": null}},
          "errors": [{"message": "Could not resolve file for path 'nope.rs'."}]
        }"#;
        let err = parse_blame_response(body, "nope.rs", "main").unwrap_err();
        assert!(matches!(err, ChurnError::GitHub(_)));
        assert!(err.to_string().contains("Could not resolve file"));
    }

    #[test]
    fn unknown_branch_is_reported() {
        let body = r#"{"data": {"repository": {"object": null}}}"#;
        let err = parse_blame_response(body, "a.rs", "release-9").unwrap_err();
        assert!(err.to_string().contains("release-9"));
    }

    #[test]
    fn missing_repository_is_reported() {
        let body = r#"{"data": {"repository": null}}"#;
        let err = parse_blame_response(body, "a.rs", "main").unwrap_err();
        assert!(err.to_string().contains("repository not found"));
    }

    #[test]
    fn reversed_range_is_a_parse_error() {
        let body = r#"{"data":{"repository":{"object":{"blame":{"ranges":[
            {"commit":{"committedDate":"2024-05-01T10:00:00Z"},"startingLine":9,"endingLine":3}
        ]}}}}}"#;
        let err = parse_blame_response(body, "a.rs", "main").unwrap_err();
        assert!(matches!(err, ChurnError::Parse(_)));
    }

    #[test]
    fn garbage_body_is_a_parse_error() {
        let err = parse_blame_response("<html>", "a.rs", "main").unwrap_err();
        assert!(matches!(err, ChurnError::Parse(_)));
    }

    #[test]
    fn graphql_endpoint_for_enterprise() {
        assert_eq!(
            graphql_endpoint("https://ghe.example.com/api/v3"),
            "https://ghe.example.com/api/graphql"
        );
        assert_eq!(
            graphql_endpoint("https://api.github.com/"),
            "https://api.github.com/graphql"
        );
    }

    #[test]
    fn blame_query_uses_variables() {
        for var in ["$owner", "$name", "$expression", "$path"] {
            assert!(BLAME_QUERY.contains(var), "missing {var}");
        }
    }

    #[test]
    fn parse_pr_reference_valid() {
        let (repo, number) = parse_pr_reference("rust-lang/rust#12345").unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.repo, "rust");
        assert_eq!(number, 12345);
    }

    #[test]
    fn parse_pr_reference_invalid() {
        assert!(parse_pr_reference("no-hash").is_err());
        assert!(parse_pr_reference("no-slash#1").is_err());
        assert!(parse_pr_reference("a/b#notnum").is_err());
        assert!(parse_pr_reference("/b#1").is_err());
    }

    #[test]
    fn explicit_token_wins() {
        assert_eq!(resolve_token(Some("ghp_explicit")).unwrap(), "ghp_explicit");
    }
}
