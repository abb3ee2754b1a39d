//! # greenbase core
//!
//! Finds the commit of the most recent GitHub Actions run on the current branch
//! that went green, either as a whole run or for one named job. CI pipelines use
//! the result as a stable base commit for incremental work.
//!
//! - [`coordination::branch`] works out the branch from the event context
//! - [`coordination::resolver`] walks run history newest-first
//! - [`traits::RunHistoryProvider`] abstracts the run/job source
//! - [`http::GitHubRunHistory`] is the GitHub REST implementation
//! - [`output`] writes `key=value` step outputs
//!
//! ## Example
//!
//! ```no_run
//! use greenbase_core::{resolve_commit, EventContext, GitHubRunHistory, RepoSlug, ResolveConfig};
//! use std::borrow::Cow;
//!
//! # async fn example() -> greenbase_core::Result<()> {
//! let provider = GitHubRunHistory::new("https://api.github.com", "ghp_...")?;
//! let repo = RepoSlug::parse("octo/hello")?;
//! let event = EventContext {
//!     event_name: Some(Cow::Borrowed("push")),
//!     git_ref: Some(Cow::Borrowed("refs/heads/main")),
//!     ..Default::default()
//! };
//! let config = ResolveConfig {
//!     job: Some(Cow::Borrowed("build")),
//!     ..Default::default()
//! };
//!
//! let (branch, resolution) = resolve_commit(&provider, &repo, &event, &config).await?;
//! println!("{branch}: {}", resolution.sha);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod coordination;
pub mod error;
pub mod http;
pub mod output;
pub mod traits;
pub mod types;

pub use coordination::{resolve_branch, CommitResolver};
pub use error::{Error, ErrorKind, Result};
pub use http::GitHubRunHistory;
pub use output::{OutputWriter, ResultSink};
pub use traits::RunHistoryProvider;
pub use types::{
    EventContext, NoMatchFallback, RepoSlug, Resolution, ResolutionSource, ResolveConfig,
    RunStatusFilter, WorkflowConclusion, WorkflowJob, WorkflowRun, WorkflowStatus, MAX_PER_PAGE,
};

/// Resolve the branch from the event, then the last green commit on it.
///
/// Returns the branch alongside the resolution so callers can report both.
/// An empty `resolution.sha` means nothing matched; that is not an error.
pub async fn resolve_commit<P: RunHistoryProvider>(
    provider: P,
    repo: &RepoSlug,
    event: &EventContext<'_>,
    config: &ResolveConfig<'_>,
) -> Result<(String, Resolution)> {
    let branch = resolve_branch(event)?;
    tracing::debug!(%repo, branch = %branch, job = ?config.job_name(), "Resolving commit");

    let resolver = CommitResolver::new(provider, repo, config);
    let resolution = resolver.resolve(&branch).await?;

    Ok((branch, resolution))
}

/// Synchronous variant of `resolve_commit`
///
/// Builds a current-thread Tokio runtime and blocks on the async version.
/// Prefer the async version if you're already in an async context.
pub fn resolve_commit_sync<P: RunHistoryProvider>(
    provider: P,
    repo: &RepoSlug,
    event: &EventContext<'_>,
    config: &ResolveConfig<'_>,
) -> Result<(String, Resolution)> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(e.to_string()))?
        .block_on(resolve_commit(provider, repo, event, config))
}
