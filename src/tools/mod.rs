pub mod output;

use crate::http::{GitHubClient, GitHubError, RepoSort};
use crate::mcp::ToolResult;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const DEFAULT_LIMIT: u32 = 30;
pub const MAX_LIMIT: u32 = 100;

pub const GET_MY_REPOS: &str = "get_my_repos";
pub const GET_REPO_DETAILS: &str = "get_repo_details";
pub const SEARCH_MY_CODE: &str = "search_my_code";
pub const GET_RECENT_ACTIVITY: &str = "get_recent_activity";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn limit_schema(what: &str) -> Value {
    serde_json::json!({
        "type": "number",
        "description": format!("Maximum number of {} to return (default: 30, max: 100)", what)
    })
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let get_my_repos = ToolDescriptor {
        name: GET_MY_REPOS.into(),
        description: "List all repositories for the authenticated user. Returns repo name, \
                      description, stars, forks, primary language, visibility and last updated \
                      date, most recently updated first."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "limit": limit_schema("repositories") },
            "required": []
        }),
    };

    let get_repo_details = ToolDescriptor {
        name: GET_REPO_DETAILS.into(),
        description: "Get detailed information about a repository: description, stats (stars, \
                      forks, watchers, open issues), primary language, language breakdown, \
                      topics and license. Pass 'owner/repo', or 'repo' for the current user."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "repo_name": {
                    "type": "string",
                    "description": "Repository name (e.g., 'owner/my-project' or 'my-project')"
                }
            },
            "required": ["repo_name"]
        }),
    };

    let search_my_code = ToolDescriptor {
        name: SEARCH_MY_CODE.into(),
        description: "Search code across all repositories accessible by the current user. \
                      Returns matching file paths and repositories. Code search is rate \
                      limited to 10 requests per minute."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query (e.g., 'function authenticate', 'class UserController')"
                },
                "limit": limit_schema("results")
            },
            "required": ["query"]
        }),
    };

    let get_recent_activity = ToolDescriptor {
        name: GET_RECENT_ACTIVITY.into(),
        description: "Get recent activity for the current user including pushes, pull requests, \
                      issues and repository creation, most recent first across all repositories."
            .into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "limit": limit_schema("events") },
            "required": []
        }),
    };

    vec![get_my_repos, get_repo_details, search_my_code, get_recent_activity]
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("limit must be between 1 and 100")]
    InvalidLimit,

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error("Failed to serialize tool output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A tool call validated into its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    GetMyRepos { limit: u32 },
    GetRepoDetails { repo_name: String },
    SearchMyCode { query: String, limit: u32 },
    GetRecentActivity { limit: u32 },
}

impl ToolRequest {
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        let empty = Map::new();
        // Anything other than an object is treated as "no arguments".
        let args = arguments.as_object().unwrap_or(&empty);
        match name {
            GET_MY_REPOS => Ok(ToolRequest::GetMyRepos {
                limit: parse_limit(args)?,
            }),
            GET_REPO_DETAILS => Ok(ToolRequest::GetRepoDetails {
                repo_name: required_str(args, "repo_name")?,
            }),
            SEARCH_MY_CODE => Ok(ToolRequest::SearchMyCode {
                query: required_str(args, "query")?,
                limit: parse_limit(args)?,
            }),
            GET_RECENT_ACTIVITY => Ok(ToolRequest::GetRecentActivity {
                limit: parse_limit(args)?,
            }),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

/// `limit` is advertised as a JSON number; integral floats are accepted.
pub fn parse_limit(args: &Map<String, Value>) -> Result<u32, ToolError> {
    let raw = match args.get("limit") {
        None | Some(Value::Null) => return Ok(DEFAULT_LIMIT),
        Some(v) => v,
    };
    let n = raw.as_i64().or_else(|| {
        raw.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    });
    match n {
        Some(n) if (1..=MAX_LIMIT as i64).contains(&n) => Ok(n as u32),
        _ => Err(ToolError::InvalidLimit),
    }
}

fn required_str(args: &Map<String, Value>, key: &'static str) -> Result<String, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ToolError::InvalidArgument {
            name: key,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn render<T: Serialize>(doc: &T) -> Result<ToolResult, ToolError> {
    let structured = serde_json::to_value(doc)?;
    let text = serde_json::to_string_pretty(&structured)?;
    Ok(ToolResult::document(text, structured))
}

/// Single entry point the host calls into. Owns the GitHub client for its lifetime.
#[derive(Debug)]
pub struct ToolDispatcher {
    client: GitHubClient,
}

impl ToolDispatcher {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Validate and run one tool call. Upstream failures propagate unchanged.
    pub async fn dispatch(&self, name: &str, arguments: &Value) -> Result<ToolResult, ToolError> {
        let request = ToolRequest::parse(name, arguments)?;
        debug!("Dispatching {:?}", request);
        self.execute(request).await
    }

    pub async fn execute(&self, request: ToolRequest) -> Result<ToolResult, ToolError> {
        let user = self.client.username();
        match request {
            ToolRequest::GetMyRepos { limit } => {
                let repos = self.client.list_repos(limit, RepoSort::Updated).await?;
                render(&output::repo_list(user, &repos))
            }
            ToolRequest::GetRepoDetails { repo_name } => {
                let detail = self.client.get_repo_detail(&repo_name).await?;
                render(&output::repo_detail(&repo_name, &detail))
            }
            ToolRequest::SearchMyCode { query, limit } => {
                let resp = self.client.search_code(&query, limit).await?;
                render(&output::code_search(&query, &resp))
            }
            ToolRequest::GetRecentActivity { limit } => {
                let events = self.client.list_user_events(limit).await?;
                render(&output::recent_activity(user, &events))
            }
        }
    }

    /// Outermost boundary: every failure becomes a single `Error: ...` text block.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> ToolResult {
        match self.dispatch(name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                error!("Error calling tool {}: {}", name, e);
                ToolResult::error(e)
            }
        }
    }

    /// Release the GitHub client.
    pub fn shutdown(mut self) {
        self.client.close();
    }
}
