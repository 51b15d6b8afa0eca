use github_account_mcp::config::Config;
use github_account_mcp::http::GitHubClient;
use github_account_mcp::tools::ToolDispatcher;
use github_account_mcp::{cli, server};
use log::info;

#[tokio::main(flavor = "current_thread")] // one tool call in flight at a time
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();

    if matches.get_flag("version") {
        println!("github-account-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    cli::init_logging(log_level.as_deref());

    let cfg = Config::from_env().map_err(anyhow::Error::msg)?;
    let client = GitHubClient::new(&cfg)?;
    info!(
        "GitHub client initialized for user: {} ({})",
        client.username(),
        cfg.api_url
    );

    let dispatcher = ToolDispatcher::new(client);
    let served = server::run_stdio_server(&dispatcher).await;
    dispatcher.shutdown();
    served
}
