//! GitHub Actions run history over the REST API

use crate::error::{Error, Result};
use crate::traits::RunHistoryProvider;
use crate::types::{
    RepoSlug, RunStatusFilter, WorkflowConclusion, WorkflowJob, WorkflowRun, WorkflowStatus,
};
use serde::Deserialize;
use std::future::Future;

/// Default GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Jobs requested per page (API maximum)
const JOBS_PER_PAGE: u32 = 100;

/// Safety limit on job pages for a single run
const MAX_JOB_PAGES: u32 = 100;

/// GitHub API response for workflow runs list
#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    #[allow(dead_code)]
    total_count: u32,
    workflow_runs: Vec<GitHubWorkflowRun>,
}

/// GitHub API workflow run object
#[derive(Debug, Deserialize)]
struct GitHubWorkflowRun {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    status: Option<String>,
    conclusion: Option<String>,
    #[serde(default)]
    head_branch: Option<String>,
    head_sha: String,
    created_at: String,
}

/// GitHub API response for workflow jobs list
#[derive(Debug, Deserialize)]
struct WorkflowJobsResponse {
    #[allow(dead_code)]
    total_count: u32,
    jobs: Vec<GitHubWorkflowJob>,
}

/// GitHub API job object
#[derive(Debug, Deserialize)]
struct GitHubWorkflowJob {
    id: u64,
    name: String,
    status: String,
    conclusion: Option<String>,
    #[allow(dead_code)]
    run_id: u64,
}

/// Parse workflow status string to enum
fn parse_status(s: &str) -> WorkflowStatus {
    match s {
        "queued" | "waiting" | "requested" | "pending" => WorkflowStatus::Queued,
        "in_progress" => WorkflowStatus::InProgress,
        _ => WorkflowStatus::Completed,
    }
}

/// Parse workflow conclusion string to enum
fn parse_conclusion(s: &str) -> WorkflowConclusion {
    match s {
        "success" => WorkflowConclusion::Success,
        "failure" => WorkflowConclusion::Failure,
        "cancelled" => WorkflowConclusion::Cancelled,
        "skipped" => WorkflowConclusion::Skipped,
        "timed_out" => WorkflowConclusion::TimedOut,
        _ => WorkflowConclusion::Neutral,
    }
}

/// Parse an RFC 3339 timestamp to Unix seconds, 0 when absent or invalid
fn parse_timestamp(s: Option<&str>) -> i64 {
    s.and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

/// Whether a `Link` header advertises a next page
fn has_next_page(link: Option<&str>) -> bool {
    link.map(|l| l.contains("rel=\"next\"")).unwrap_or(false)
}

/// Map a response status to an error.
///
/// Primary rate limit: 429, or 403 with `x-ratelimit-remaining: 0`. A 403 with
/// quota left is a permission problem and reported as a workflow error.
fn check_status(status: reqwest::StatusCode, remaining: Option<&str>, what: &str) -> Result<()> {
    let limited = status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || (status == reqwest::StatusCode::FORBIDDEN && remaining == Some("0"));

    if limited {
        return Err(Error::RateLimitExceeded(format!(
            "GitHub API rate limit exceeded while fetching {}. Remaining: {}",
            what,
            remaining.unwrap_or("unknown")
        )));
    }

    if !status.is_success() {
        return Err(Error::Workflow(format!(
            "GitHub API returned error fetching {}: {}",
            what, status
        )));
    }

    Ok(())
}

/// Next jobs page to request after `page`, `None` once the listing is exhausted
fn next_jobs_page(page: u32, has_next: bool, page_len: usize, run_id: u64) -> Result<Option<u32>> {
    if !has_next || page_len == 0 {
        return Ok(None);
    }

    let next = page + 1;
    if next > MAX_JOB_PAGES {
        return Err(Error::Workflow(format!(
            "Workflow run {} has too many jobs (>{})",
            run_id,
            MAX_JOB_PAGES * JOBS_PER_PAGE
        )));
    }

    Ok(Some(next))
}

/// GitHub Actions run history client
pub struct GitHubRunHistory {
    client: reqwest::Client,
    base_url: String,
    token: String,
    workflow: Option<String>,
}

impl std::fmt::Debug for GitHubRunHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRunHistory")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("workflow", &self.workflow)
            .finish_non_exhaustive()
    }
}

impl GitHubRunHistory {
    /// Create new client. The token is required; an empty token is a configuration error.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::missing_input("token"));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("greenbase/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            workflow: None,
        })
    }

    /// Restrict run listing to one workflow (file name like `ci.yml`, or numeric ID)
    pub fn with_workflow(mut self, workflow: Option<String>) -> Self {
        self.workflow = workflow.filter(|w| !w.is_empty());
        self
    }

    /// Endpoint for run listing, repository-wide or scoped to a workflow
    fn runs_url(&self, repo: &RepoSlug) -> String {
        match &self.workflow {
            Some(workflow) => format!(
                "{}/repos/{}/{}/actions/workflows/{}/runs",
                self.base_url, repo.owner, repo.name, workflow
            ),
            None => format!(
                "{}/repos/{}/{}/actions/runs",
                self.base_url, repo.owner, repo.name
            ),
        }
    }

    /// Send an authenticated GET and map failure statuses
    async fn get(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| Error::Http(format!("Failed to fetch {}: {}", what, e.without_url())))?;

        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok());
        check_status(response.status(), remaining, what)?;

        Ok(response)
    }

    /// Convert GitHub API job to our type
    fn convert_workflow_job(job: GitHubWorkflowJob, run_id: u64) -> WorkflowJob {
        WorkflowJob {
            id: job.id,
            status: parse_status(&job.status),
            conclusion: job.conclusion.as_deref().map(parse_conclusion),
            name: job.name,
            run_id,
        }
    }

    /// Convert GitHub API workflow run to our type
    fn convert_workflow_run(run: GitHubWorkflowRun) -> WorkflowRun {
        WorkflowRun {
            id: run.id,
            name: run.name.unwrap_or_default(),
            // GitHub omits status only for very old runs; treat those as finished
            status: run
                .status
                .as_deref()
                .map(parse_status)
                .unwrap_or(WorkflowStatus::Completed),
            conclusion: run.conclusion.as_deref().map(parse_conclusion),
            branch: run.head_branch.unwrap_or_default(),
            head_sha: run.head_sha,
            created_at: parse_timestamp(Some(&run.created_at)),
        }
    }

    /// List workflow runs for a branch with filtering
    ///
    /// Endpoint: GET /repos/{owner}/{repo}/actions/runs
    /// (or /actions/workflows/{workflow}/runs when scoped)
    /// Query params: branch, status, per_page, page
    pub async fn fetch_workflow_runs(
        &self,
        repo: &RepoSlug,
        branch: &str,
        status: Option<RunStatusFilter>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<WorkflowRun>> {
        let mut request = self.client.get(self.runs_url(repo)).query(&[
            ("per_page", per_page.to_string().as_str()),
            ("page", page.to_string().as_str()),
        ]);

        // Empty branch = all branches
        if !branch.is_empty() {
            request = request.query(&[("branch", branch)]);
        }

        if let Some(status_filter) = status {
            request = request.query(&[("status", status_filter.as_str())]);
        }

        let response = self.get(request, "workflow runs").await?;

        let runs_response: WorkflowRunsResponse = response.json().await.map_err(|e| {
            Error::Workflow(format!("Failed to parse workflow runs response: {}", e))
        })?;

        Ok(runs_response
            .workflow_runs
            .into_iter()
            .map(Self::convert_workflow_run)
            .collect())
    }

    /// List all jobs for a workflow run, including jobs from every attempt
    ///
    /// Endpoint: GET /repos/{owner}/{repo}/actions/runs/{run_id}/jobs?filter=all
    /// Follows `Link: rel="next"` pagination.
    pub async fn fetch_workflow_jobs(&self, repo: &RepoSlug, run_id: u64) -> Result<Vec<WorkflowJob>> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{}/jobs",
            self.base_url, repo.owner, repo.name, run_id
        );

        let mut all_jobs = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self.client.get(&url).query(&[
                ("filter", "all"),
                ("per_page", JOBS_PER_PAGE.to_string().as_str()),
                ("page", page.to_string().as_str()),
            ]);

            let response = self.get(request, "workflow jobs").await?;

            let has_next = has_next_page(
                response
                    .headers()
                    .get("Link")
                    .and_then(|v| v.to_str().ok()),
            );

            let jobs_response: WorkflowJobsResponse = response.json().await.map_err(|e| {
                Error::Workflow(format!("Failed to parse workflow jobs response: {}", e))
            })?;

            let page_len = jobs_response.jobs.len();
            all_jobs.extend(
                jobs_response
                    .jobs
                    .into_iter()
                    .map(|job| Self::convert_workflow_job(job, run_id)),
            );

            match next_jobs_page(page, has_next, page_len, run_id)? {
                Some(next) => page = next,
                None => break,
            }
        }

        tracing::debug!(run_id, jobs = all_jobs.len(), "Fetched workflow jobs");
        Ok(all_jobs)
    }
}

impl RunHistoryProvider for GitHubRunHistory {
    fn list_workflow_runs<'a>(
        &'a self,
        repo: &'a RepoSlug,
        branch: &'a str,
        status: Option<RunStatusFilter>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<WorkflowRun>>> + Send + 'a {
        self.fetch_workflow_runs(repo, branch, status, page, per_page)
    }

    fn list_jobs_for_run<'a>(
        &'a self,
        repo: &'a RepoSlug,
        run_id: u64,
    ) -> impl Future<Output = Result<Vec<WorkflowJob>>> + Send + 'a {
        self.fetch_workflow_jobs(repo, run_id)
    }
}
