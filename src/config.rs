use std::env;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_API_VERSION: &str = "2022-11-28";
pub const DEFAULT_USERNAME: &str = "jw1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Token and account the server acts on behalf of. Set once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub username: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }
}

// Keep the token out of debug logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("username", &self.username)
            .finish()
    }
}

/// Runtime configuration for the GitHub API client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Configuration with every default applied.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            user_agent: default_user_agent(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN [required]
    /// - GITHUB_USERNAME (default: jw1)
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-account-mcp/<version>)
    pub fn from_env() -> Result<Self, String> {
        let token = env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                "Missing GITHUB_TOKEN; create a personal access token with 'repo' and 'read:user' scopes"
                    .to_string()
            })?;
        let username = env::var("GITHUB_USERNAME")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let api_url = env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        url::Url::parse(&api_url).map_err(|e| format!("Invalid GITHUB_API_URL '{}': {}", api_url, e))?;

        let api_version =
            env::var("GITHUB_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        let timeout_secs = env::var("GITHUB_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let user_agent = env::var("GITHUB_USER_AGENT").unwrap_or_else(|_| default_user_agent());

        Ok(Self {
            credentials: Credentials::new(token, username),
            api_url: String::new(),
            api_version,
            user_agent,
            timeout_secs,
        }
        .with_api_url(api_url))
    }
}

fn default_user_agent() -> String {
    format!("github-account-mcp/{}", env!("CARGO_PKG_VERSION"))
}
