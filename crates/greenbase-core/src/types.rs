//! Core type definitions

use crate::error::{Error, Result};
use std::borrow::Cow;

/// Lifecycle status of a workflow run or job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkflowStatus {
    /// Waiting for a runner
    Queued,
    /// Currently executing
    InProgress,
    /// Finished; see the conclusion
    Completed,
}

impl WorkflowStatus {
    /// API string representation
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Terminal outcome of a completed run or job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkflowConclusion {
    /// Succeeded
    Success,
    /// Failed
    Failure,
    /// Cancelled before finishing
    Cancelled,
    /// Skipped by a condition
    Skipped,
    /// Exceeded its time limit
    TimedOut,
    /// Anything else (neutral, action_required, stale, ...)
    Neutral,
}

impl WorkflowConclusion {
    /// API string representation
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::Neutral => "neutral",
        }
    }
}

/// Status filter accepted by the run listing endpoint.
///
/// GitHub accepts both lifecycle statuses and conclusions in the same `status`
/// query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatusFilter {
    /// Only completed runs, whatever their conclusion
    Completed,
    /// Only completed runs that concluded with success
    Success,
}

impl RunStatusFilter {
    /// Query parameter value
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Success => "success",
        }
    }
}

/// One execution of a workflow, as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    /// Run ID
    pub id: u64,
    /// Workflow name
    pub name: String,
    /// Lifecycle status
    pub status: WorkflowStatus,
    /// Conclusion (only meaningful when completed)
    pub conclusion: Option<WorkflowConclusion>,
    /// Branch the run was triggered on
    pub branch: String,
    /// Commit that triggered the run
    pub head_sha: String,
    /// Creation time (Unix seconds, 0 when unparseable)
    pub created_at: i64,
}

impl WorkflowRun {
    /// Whether the run has finished
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// A named job inside a workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowJob {
    /// Job ID
    pub id: u64,
    /// Job name as displayed in the run
    pub name: String,
    /// Lifecycle status
    pub status: WorkflowStatus,
    /// Conclusion (only meaningful when completed)
    pub conclusion: Option<WorkflowConclusion>,
    /// Owning run ID
    pub run_id: u64,
}

impl WorkflowJob {
    /// Job is named `name`, has completed, and concluded with success
    #[inline]
    pub fn succeeded_as(&self, name: &str) -> bool {
        self.name == name
            && self.status == WorkflowStatus::Completed
            && self.conclusion == Some(WorkflowConclusion::Success)
    }
}

/// Repository coordinates (`owner/name`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoSlug {
    /// Parse `owner/name`, as found in `GITHUB_REPOSITORY`
    pub fn parse(repository: &str) -> Result<Self> {
        let mut parts = repository.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(Error::Config(format!(
                "Invalid repository format (expected owner/name): {}",
                repository
            ))),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Triggering event context, read once at process start
#[derive(Debug, Clone, Default)]
pub struct EventContext<'a> {
    /// Event name (`push`, `pull_request`, ...)
    pub event_name: Option<Cow<'a, str>>,
    /// Pull request head branch
    pub head_ref: Option<Cow<'a, str>>,
    /// Full ref path (`refs/heads/main`)
    pub git_ref: Option<Cow<'a, str>>,
}

/// What Mode B yields when no run contains a successful instance of the job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoMatchFallback {
    /// Empty string: "nothing to compare against"
    #[default]
    Empty,
    /// Head commit of the newest run on the branch, regardless of outcome
    NewestRun,
}

impl NoMatchFallback {
    /// Parse from the CLI/action input value
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "" | "empty" => Ok(Self::Empty),
            "newest-run" | "newest_run" | "latest" => Ok(Self::NewestRun),
            other => Err(Error::Config(format!(
                "Invalid fallback: {} (expected empty or newest-run)",
                other
            ))),
        }
    }

    /// Canonical input value
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::NewestRun => "newest-run",
        }
    }
}

/// Largest page size the run listing endpoint honours
pub const MAX_PER_PAGE: u32 = 100;

/// Resolution configuration, built once and passed into the resolver
#[derive(Debug, Clone)]
pub struct ResolveConfig<'a> {
    /// Job to look for; `None` or empty selects "latest successful run"
    pub job: Option<Cow<'a, str>>,
    /// Behaviour when the job never succeeded
    pub fallback: NoMatchFallback,
    /// Ask the provider for completed runs only while scanning for a job
    pub prefilter_completed: bool,
    /// Runs requested per page while scanning history, capped at [`MAX_PER_PAGE`]
    pub per_page: u32,
    /// Upper bound on pages scanned before giving up
    pub max_pages: u32,
}

impl<'a> ResolveConfig<'a> {
    /// The job name, if one was supplied and is non-empty
    #[inline]
    pub fn job_name(&self) -> Option<&str> {
        self.job.as_deref().filter(|j| !j.is_empty())
    }

    /// Page size actually requested; larger values would be truncated by the
    /// provider and end the scan after one short page.
    #[inline]
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

impl<'a> Default for ResolveConfig<'a> {
    fn default() -> Self {
        Self {
            job: None,
            fallback: NoMatchFallback::Empty,
            prefilter_completed: false,
            per_page: MAX_PER_PAGE,
            max_pages: 1000,
        }
    }
}

/// How a resolution result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Newest successful run on the branch (no job name)
    LatestSuccessfulRun {
        /// Run ID
        run_id: u64,
    },
    /// Newest completed run containing a successful instance of the job
    JobSucceeded {
        /// Run ID
        run_id: u64,
    },
    /// Job never succeeded; newest run's commit used
    NewestRunFallback {
        /// Run ID
        run_id: u64,
    },
    /// Nothing matched
    NotFound,
}

impl ResolutionSource {
    /// Short label for logs and JSON output
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LatestSuccessfulRun { .. } => "latest_successful_run",
            Self::JobSucceeded { .. } => "job_succeeded",
            Self::NewestRunFallback { .. } => "newest_run_fallback",
            Self::NotFound => "not_found",
        }
    }

    /// Run the commit was taken from, if any
    pub const fn run_id(&self) -> Option<u64> {
        match self {
            Self::LatestSuccessfulRun { run_id }
            | Self::JobSucceeded { run_id }
            | Self::NewestRunFallback { run_id } => Some(*run_id),
            Self::NotFound => None,
        }
    }
}

/// Result of one resolution: a commit hash or the empty string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Commit hash, empty when nothing matched
    pub sha: String,
    /// Rule that produced `sha`
    pub source: ResolutionSource,
}

impl Resolution {
    /// The empty result
    pub fn not_found() -> Self {
        Self {
            sha: String::new(),
            source: ResolutionSource::NotFound,
        }
    }

    /// Whether a commit was found
    #[inline]
    pub fn is_found(&self) -> bool {
        !self.sha.is_empty()
    }
}
