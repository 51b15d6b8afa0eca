//! Shaping of raw GitHub responses into the documents returned to the assistant.

use crate::http::{CodeSearchResponse, Event, RepoDetail, Repository};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const SORTED_BY_LABEL: &str = "recently_updated";
pub const NO_REPOSITORIES: &str = "No repositories found.";
pub const NO_EVENTS: &str = "No recent activity found.";

fn visibility(private: bool) -> &'static str {
    if private {
        "private"
    } else {
        "public"
    }
}

#[derive(Debug, Serialize)]
pub struct RepoListOutput {
    pub summary: RepoListSummary,
    pub repositories: Vec<RepoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct RepoListSummary {
    pub user: String,
    pub count: usize,
    pub total_stars: u64,
    pub total_forks: u64,
    pub sorted_by: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RepoSummary {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub visibility: &'static str,
    pub updated_at: Option<String>,
    pub url: Option<String>,
}

pub fn repo_list(user: &str, repos: &[Repository]) -> RepoListOutput {
    let repositories = repos
        .iter()
        .map(|r| RepoSummary {
            name: r.name.clone(),
            full_name: r.full_name.clone(),
            description: r.description.clone(),
            stars: r.stargazers_count,
            forks: r.forks_count,
            language: r.language.clone(),
            visibility: visibility(r.private),
            updated_at: r.updated_at.clone(),
            url: r.html_url.clone(),
        })
        .collect::<Vec<_>>();
    RepoListOutput {
        summary: RepoListSummary {
            user: user.to_string(),
            count: repositories.len(),
            total_stars: repos.iter().map(|r| r.stargazers_count).sum(),
            total_forks: repos.iter().map(|r| r.forks_count).sum(),
            sorted_by: SORTED_BY_LABEL,
        },
        message: repositories.is_empty().then_some(NO_REPOSITORIES),
        repositories,
    }
}

#[derive(Debug, Serialize)]
pub struct RepoDetailOutput {
    pub full_name: String,
    pub description: Option<String>,
    pub statistics: RepoStatistics,
    pub details: RepoDetails,
    pub language_breakdown: Map<String, Value>,
    pub language_breakdown_status: &'static str,
    pub topics: Vec<String>,
    pub urls: RepoUrls,
    pub license: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepoStatistics {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
}

#[derive(Debug, Serialize)]
pub struct RepoDetails {
    pub primary_language: Option<String>,
    pub visibility: &'static str,
    pub default_branch: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RepoUrls {
    pub repository: Option<String>,
    pub homepage: Option<String>,
}

/// Share of each language in percent, rounded to one decimal. Empty when the
/// breakdown is empty or sums to zero.
pub fn language_percentages(entries: &[(String, u64)]) -> Vec<(String, f64)> {
    let total: u128 = entries.iter().map(|(_, b)| *b as u128).sum();
    if total == 0 {
        return Vec::new();
    }
    entries
        .iter()
        .map(|(lang, bytes)| {
            let pct = (*bytes as f64 / total as f64 * 1000.0).round() / 10.0;
            (lang.clone(), pct)
        })
        .collect()
}

pub fn repo_detail(requested: &str, detail: &RepoDetail) -> RepoDetailOutput {
    let repo = &detail.repo;
    let language_breakdown = language_percentages(detail.languages.entries())
        .into_iter()
        .map(|(lang, pct)| (lang, Value::from(pct)))
        .collect::<Map<_, _>>();
    RepoDetailOutput {
        full_name: repo.full_name.clone().unwrap_or_else(|| requested.to_string()),
        description: repo.description.clone(),
        statistics: RepoStatistics {
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            watchers: repo.watchers_count,
            open_issues: repo.open_issues_count,
        },
        details: RepoDetails {
            primary_language: repo.language.clone(),
            visibility: visibility(repo.private),
            default_branch: repo.default_branch.clone().unwrap_or_else(|| "main".to_string()),
            created_at: repo.created_at.clone(),
            updated_at: repo.updated_at.clone(),
        },
        language_breakdown,
        language_breakdown_status: if detail.languages.is_available() {
            "available"
        } else {
            "unavailable"
        },
        topics: repo.topics.clone(),
        urls: RepoUrls {
            repository: repo.html_url.clone(),
            homepage: repo.homepage.clone(),
        },
        license: repo.license.as_ref().and_then(|l| l.name.clone()),
    }
}

#[derive(Debug, Serialize)]
pub struct CodeSearchOutput {
    pub query: String,
    pub total_count: u64,
    pub returned_count: usize,
    pub matches: Vec<CodeMatch>,
}

#[derive(Debug, Serialize)]
pub struct CodeMatch {
    pub repository: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
}

pub fn code_search(query: &str, resp: &CodeSearchResponse) -> CodeSearchOutput {
    if resp.total_count == 0 {
        return CodeSearchOutput {
            query: query.to_string(),
            total_count: 0,
            returned_count: 0,
            matches: Vec::new(),
        };
    }
    let matches = resp
        .items
        .iter()
        .map(|item| CodeMatch {
            repository: item.repository.as_ref().and_then(|r| r.full_name.clone()),
            path: item.path.clone(),
            url: item.html_url.clone(),
        })
        .collect::<Vec<_>>();
    CodeSearchOutput {
        query: query.to_string(),
        total_count: resp.total_count,
        returned_count: matches.len(),
        matches,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push,
    PullRequest,
    Issues,
    Create,
    Watch,
    Fork,
    Other(String),
}

impl EventKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "PushEvent" => EventKind::Push,
            "PullRequestEvent" => EventKind::PullRequest,
            "IssuesEvent" => EventKind::Issues,
            "CreateEvent" => EventKind::Create,
            "WatchEvent" => EventKind::Watch,
            "ForkEvent" => EventKind::Fork,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Push => "PushEvent",
            EventKind::PullRequest => "PullRequestEvent",
            EventKind::Issues => "IssuesEvent",
            EventKind::Create => "CreateEvent",
            EventKind::Watch => "WatchEvent",
            EventKind::Fork => "ForkEvent",
            EventKind::Other(tag) => tag,
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventDetails {
    Push {
        branch: String,
        commit_count: usize,
    },
    // Shared by PullRequestEvent and IssuesEvent.
    Item {
        action: Option<String>,
        title: Option<String>,
        number: Option<u64>,
    },
    Create {
        ref_type: Option<String>,
        #[serde(rename = "ref")]
        git_ref: Option<String>,
    },
    Watch {
        action: &'static str,
    },
    Fork {
        forkee: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub repository: Option<String>,
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<EventDetails>,
}

fn str_at(v: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(v, |cur, key| cur.get(*key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn u64_at(v: &Value, path: &[&str]) -> Option<u64> {
    path.iter().try_fold(v, |cur, key| cur.get(*key)).and_then(Value::as_u64)
}

/// Last path segment of a git ref, or the whole ref when it has no '/'.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}

pub fn activity_event(event: &Event) -> ActivityEvent {
    let kind = EventKind::parse(event.kind.as_deref().unwrap_or("Unknown"));
    let payload = &event.payload;
    let details = match &kind {
        EventKind::Push => {
            let git_ref = payload.get("ref").and_then(Value::as_str).unwrap_or("");
            Some(EventDetails::Push {
                branch: branch_from_ref(git_ref).to_string(),
                commit_count: payload
                    .get("commits")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len),
            })
        }
        EventKind::PullRequest => Some(EventDetails::Item {
            action: str_at(payload, &["action"]),
            title: str_at(payload, &["pull_request", "title"]),
            number: u64_at(payload, &["pull_request", "number"]),
        }),
        EventKind::Issues => Some(EventDetails::Item {
            action: str_at(payload, &["action"]),
            title: str_at(payload, &["issue", "title"]),
            number: u64_at(payload, &["issue", "number"]),
        }),
        EventKind::Create => Some(EventDetails::Create {
            ref_type: str_at(payload, &["ref_type"]),
            git_ref: str_at(payload, &["ref"]),
        }),
        EventKind::Watch => Some(EventDetails::Watch { action: "starred" }),
        EventKind::Fork => Some(EventDetails::Fork {
            forkee: str_at(payload, &["forkee", "full_name"]),
        }),
        EventKind::Other(_) => None,
    };
    ActivityEvent {
        kind,
        repository: event.repo.as_ref().and_then(|r| r.name.clone()),
        created_at: event.created_at.clone(),
        details,
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityOutput {
    pub user: String,
    pub event_count: usize,
    pub events: Vec<ActivityEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn recent_activity(user: &str, events: &[Event]) -> ActivityOutput {
    let events = events.iter().map(activity_event).collect::<Vec<_>>();
    ActivityOutput {
        user: user.to_string(),
        event_count: events.len(),
        message: events.is_empty().then_some(NO_EVENTS),
        events,
    }
}
