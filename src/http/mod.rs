use crate::config::Config;
use crate::types::RateMeta;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const ACCEPT_V3: &str = "application/vnd.github.v3+json";
pub const RATE_LIMIT_WARNING_THRESHOLD: i64 = 100;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("Authentication failed. Check your GITHUB_TOKEN.")]
    Unauthorized,

    #[error("GitHub API rate limit exceeded. Resets at: {reset}")]
    RateLimited { reset: String },

    #[error("Access forbidden. Check token permissions (need 'repo' scope).")]
    Forbidden,

    #[error("Resource not found or not accessible.")]
    NotFound,

    #[error("GitHub API error: {body}")]
    Api { status: StatusCode, body: String },

    #[error("GitHub API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected GitHub API response: {0}")]
    Decode(String),

    #[error("GitHub client has been closed")]
    Closed,

    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

/// Translate a non-2xx response into the error vocabulary shown to the assistant.
pub fn map_status_to_error(status: StatusCode, headers: &HeaderMap, body: &str) -> GitHubError {
    match status {
        StatusCode::UNAUTHORIZED => GitHubError::Unauthorized,
        StatusCode::FORBIDDEN if body.to_lowercase().contains("rate limit") => {
            let reset = headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            GitHubError::RateLimited { reset }
        }
        StatusCode::FORBIDDEN => GitHubError::Forbidden,
        StatusCode::NOT_FOUND => GitHubError::NotFound,
        _ => GitHubError::Api {
            status,
            body: body.to_string(),
        },
    }
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let header_i64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    };
    let reset_at = header_i64("x-ratelimit-reset")
        .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
        .map(|dt| dt.to_rfc3339());
    RateMeta {
        remaining: header_i64("x-ratelimit-remaining"),
        used: header_i64("x-ratelimit-used"),
        reset_at,
    }
}

/// Warn when the remaining quota drops below the threshold. Returns the remaining
/// count in that case; never affects the response.
pub fn observe_rate_limit(headers: &HeaderMap) -> Option<i64> {
    let rate = extract_rate_from_rest(headers);
    if !rate.is_low(RATE_LIMIT_WARNING_THRESHOLD) {
        return None;
    }
    let remaining = rate.remaining?;
    warn!(
        "GitHub API rate limit low: {} requests remaining (resets at {})",
        remaining,
        rate.reset_at.as_deref().unwrap_or("unknown")
    );
    Some(remaining)
}

/// Repository identifier: `owner/name`, or a bare `name` owned by the configured user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    // Splits on the first '/' only; "" yields the default owner with an empty name.
    pub fn parse(input: &str, default_owner: &str) -> Self {
        match input.split_once('/') {
            Some((owner, name)) => Self {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            None => Self {
                owner: default_owner.to_string(),
                name: input.to_string(),
            },
        }
    }

    pub fn api_path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoSort {
    Created,
    Updated,
    Pushed,
    FullName,
}

impl RepoSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoSort::Created => "created",
            RepoSort::Updated => "updated",
            RepoSort::Pushed => "pushed",
            RepoSort::FullName => "full_name",
        }
    }
}

// Upstream repository object; only the fields the tools project.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Repository {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub watchers_count: u64,
    pub open_issues_count: u64,
    pub language: Option<String>,
    pub private: bool,
    pub default_branch: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub html_url: Option<String>,
    pub homepage: Option<String>,
    pub topics: Vec<String>,
    pub license: Option<License>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct License {
    pub name: Option<String>,
}

/// Byte count per language, or a marker that the breakdown could not be fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum LanguageBreakdown {
    Available(Vec<(String, u64)>),
    Unavailable,
}

impl LanguageBreakdown {
    /// Coerce the raw `/languages` payload. Non-mapping shapes are unavailable;
    /// individual non-numeric values are dropped.
    pub fn from_value(value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            other => {
                debug!("Unexpected languages response shape: {}", other);
                return LanguageBreakdown::Unavailable;
            }
        };
        let mut out = Vec::with_capacity(map.len());
        for (lang, raw) in map {
            match coerce_bytes(&raw) {
                Some(bytes) => out.push((lang, bytes)),
                None => debug!("Skipping non-numeric language value for {}: {}", lang, raw),
            }
        }
        LanguageBreakdown::Available(out)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, LanguageBreakdown::Available(_))
    }

    pub fn entries(&self) -> &[(String, u64)] {
        match self {
            LanguageBreakdown::Available(v) => v,
            LanguageBreakdown::Unavailable => &[],
        }
    }
}

fn coerce_bytes(raw: &Value) -> Option<u64> {
    match raw {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoDetail {
    pub repo: Repository,
    pub languages: LanguageBreakdown,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodeSearchResponse {
    pub total_count: u64,
    pub items: Vec<CodeSearchItem>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodeSearchItem {
    pub path: Option<String>,
    pub html_url: Option<String>,
    pub repository: Option<SearchRepository>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchRepository {
    pub full_name: Option<String>,
}

// Events keep their payload untyped; its shape depends on `type`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub repo: Option<EventRepo>,
    pub created_at: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventRepo {
    pub name: Option<String>,
}

/// Authenticated client for the GitHub REST API.
///
/// The underlying connection pool is released by [`GitHubClient::close`]; calls made
/// after that fail with [`GitHubError::Closed`].
#[derive(Debug)]
pub struct GitHubClient {
    http: Option<Client>,
    api_url: String,
    username: String,
}

impl GitHubClient {
    pub fn new(cfg: &Config) -> Result<Self, GitHubError> {
        let mut default_headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", cfg.credentials.token))
            .map_err(|_| GitHubError::InvalidHeader("Authorization"))?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
        default_headers.insert(
            "x-github-api-version",
            HeaderValue::from_str(&cfg.api_version)
                .map_err(|_| GitHubError::InvalidHeader("X-GitHub-Api-Version"))?,
        );
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.user_agent).map_err(|_| GitHubError::InvalidHeader("User-Agent"))?,
        );
        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            http: Some(http),
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            username: cfg.credentials.username.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    /// Release the connection pool. Safe to call more than once.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            info!("GitHub client closed");
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GitHubError> {
        let client = self.http.as_ref().ok_or(GitHubError::Closed)?;
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);
        let res = client.get(&url).query(query).send().await?;

        let status = res.status();
        if !status.is_success() {
            let headers = res.headers().clone();
            let body = res.text().await.unwrap_or_default();
            debug!("GET {} failed with status {}", url, status);
            return Err(map_status_to_error(status, &headers, &body));
        }
        observe_rate_limit(res.headers());
        res.json::<T>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// One page of repositories the user owns, collaborates on, or reaches through an org.
    pub async fn list_repos(&self, per_page: u32, sort: RepoSort) -> Result<Vec<Repository>, GitHubError> {
        let query = [
            ("per_page", per_page.min(MAX_PER_PAGE).to_string()),
            ("sort", sort.as_str().to_string()),
            ("affiliation", "owner,collaborator,organization_member".to_string()),
        ];
        self.get_json("/user/repos", &query).await
    }

    /// Repository metadata plus language breakdown. A failed breakdown fetch degrades
    /// to [`LanguageBreakdown::Unavailable`] instead of failing the call.
    pub async fn get_repo_detail(&self, repo_ref: &str) -> Result<RepoDetail, GitHubError> {
        let target = RepoRef::parse(repo_ref, &self.username);
        let path = target.api_path();
        let repo: Repository = self.get_json(&path, &[]).await?;

        let languages = match self.get_json::<Value>(&format!("{}/languages", path), &[]).await {
            Ok(v) => LanguageBreakdown::from_value(v),
            Err(e) => {
                debug!("Could not fetch languages for {}: {}", repo_ref, e);
                LanguageBreakdown::Unavailable
            }
        };
        Ok(RepoDetail { repo, languages })
    }

    /// Code search scoped to the configured user's repositories.
    pub async fn search_code(&self, query: &str, per_page: u32) -> Result<CodeSearchResponse, GitHubError> {
        let params = [
            ("q", format!("{} user:{}", query, self.username)),
            ("per_page", per_page.min(MAX_PER_PAGE).to_string()),
        ];
        self.get_json("/search/code", &params).await
    }

    pub async fn list_user_events(&self, per_page: u32) -> Result<Vec<Event>, GitHubError> {
        let path = format!("/users/{}/events", self.username);
        let params = [("per_page", per_page.min(MAX_PER_PAGE).to_string())];
        self.get_json(&path, &params).await
    }
}
