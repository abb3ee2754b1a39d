//! HTTP adapters for the GitHub API

pub mod workflows;

pub use workflows::{GitHubRunHistory, DEFAULT_API_URL};
