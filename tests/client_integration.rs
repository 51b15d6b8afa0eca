use github_account_mcp::config::{Config, Credentials};
use github_account_mcp::http::{GitHubClient, GitHubError, LanguageBreakdown, RepoSort};
use httpmock::{Method::GET, MockServer};
use serde_json::json;

fn client(server: &MockServer) -> GitHubClient {
    let cfg = Config::new(Credentials::new("t0k", "octo")).with_api_url(server.base_url());
    GitHubClient::new(&cfg).unwrap()
}

#[tokio::test]
async fn list_repos_sends_auth_headers_and_affiliation() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/user/repos")
                .header("authorization", "token t0k")
                .header("accept", "application/vnd.github.v3+json")
                .header("x-github-api-version", "2022-11-28")
                .query_param("per_page", "30")
                .query_param("sort", "updated")
                .query_param("affiliation", "owner,collaborator,organization_member");
            then.status(200)
                .json_body(json!([{"name": "a", "full_name": "octo/a", "stargazers_count": 3}]));
        })
        .await;
    let repos = client(&server).list_repos(30, RepoSort::Updated).await.unwrap();
    m.assert_async().await;
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].full_name.as_deref(), Some("octo/a"));
    assert_eq!(repos[0].stargazers_count, 3);
}

#[tokio::test]
async fn per_page_is_capped() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octo/events").query_param("per_page", "100");
            then.status(200).json_body(json!([]));
        })
        .await;
    let events = client(&server).list_user_events(500).await.unwrap();
    m.assert_async().await;
    assert!(events.is_empty());
}

#[tokio::test]
async fn search_is_scoped_to_user() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/search/code")
                .query_param("q", "fn main user:octo")
                .query_param("per_page", "10");
            then.status(200).json_body(json!({
                "total_count": 1,
                "incomplete_results": false,
                "items": [{"path": "src/main.rs", "html_url": "https://github.com/octo/a/blob/main/src/main.rs",
                           "repository": {"full_name": "octo/a"}}]
            }));
        })
        .await;
    let resp = client(&server).search_code("fn main", 10).await.unwrap();
    m.assert_async().await;
    assert_eq!(resp.total_count, 1);
    assert_eq!(resp.items[0].path.as_deref(), Some("src/main.rs"));
}

#[tokio::test]
async fn repo_detail_uses_default_owner_and_languages() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/octo/proj");
            then.status(200).json_body(json!({"full_name": "octo/proj"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/octo/proj/languages");
            then.status(200).json_body(json!({"Rust": 900, "Shell": 100}));
        })
        .await;
    let detail = client(&server).get_repo_detail("proj").await.unwrap();
    assert_eq!(
        detail.languages,
        LanguageBreakdown::Available(vec![("Rust".into(), 900), ("Shell".into(), 100)])
    );
}

#[tokio::test]
async fn repo_detail_survives_language_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r");
            then.status(200).json_body(json!({"full_name": "o/r"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/languages");
            then.status(500).body("boom");
        })
        .await;
    let detail = client(&server).get_repo_detail("o/r").await.unwrap();
    assert_eq!(detail.languages, LanguageBreakdown::Unavailable);
    assert_eq!(detail.repo.full_name.as_deref(), Some("o/r"));
}

#[tokio::test]
async fn repo_detail_non_mapping_languages_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r");
            then.status(200).json_body(json!({"full_name": "o/r"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/r/languages");
            then.status(200).json_body(json!(["Rust"]));
        })
        .await;
    let detail = client(&server).get_repo_detail("o/r").await.unwrap();
    assert!(!detail.languages.is_available());
}

#[tokio::test]
async fn status_codes_map_to_domain_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octo/events");
            then.status(401).body("{\"message\":\"Bad credentials\"}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/code");
            then.status(403)
                .header("x-ratelimit-reset", "1700000000")
                .body("{\"message\":\"API rate limit exceeded for user ID 1.\"}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/user/repos");
            then.status(403).body("{\"message\":\"Resource not accessible by integration\"}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/missing");
            then.status(404).body("{\"message\":\"Not Found\"}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/o/broken");
            then.status(502).body("bad gateway");
        })
        .await;

    let c = client(&server);
    let e = c.list_user_events(5).await.unwrap_err();
    assert!(matches!(e, GitHubError::Unauthorized));

    let e = c.search_code("x", 5).await.unwrap_err();
    assert_eq!(e.to_string(), "GitHub API rate limit exceeded. Resets at: 1700000000");

    let e = c.list_repos(5, RepoSort::Updated).await.unwrap_err();
    assert!(matches!(e, GitHubError::Forbidden));

    let e = c.get_repo_detail("o/missing").await.unwrap_err();
    assert_eq!(e.to_string(), "Resource not found or not accessible.");

    let e = c.get_repo_detail("o/broken").await.unwrap_err();
    assert_eq!(e.to_string(), "GitHub API error: bad gateway");
}

#[tokio::test]
async fn low_rate_limit_does_not_affect_result() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/user/repos");
            then.status(200)
                .header("x-ratelimit-remaining", "3")
                .json_body(json!([]));
        })
        .await;
    let repos = client(&server).list_repos(1, RepoSort::Pushed).await.unwrap();
    assert!(repos.is_empty());
}

#[tokio::test]
async fn closed_client_refuses_calls() {
    let server = MockServer::start_async().await;
    let mut c = client(&server);
    c.close();
    c.close();
    let e = c.list_user_events(5).await.unwrap_err();
    assert!(matches!(e, GitHubError::Closed));
}
