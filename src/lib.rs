//! Read-only GitHub account tools (repositories, repository detail, code search and
//! recent activity) served to an assistant host over MCP stdio.

pub mod cli;
pub mod config;
pub mod http;
pub mod mcp;
pub mod server;
pub mod tools;
pub mod types;
