//! In-memory run history for resolver tests

#![allow(dead_code)]

use greenbase_core::{
    Error, RepoSlug, Result, RunHistoryProvider, RunStatusFilter, WorkflowConclusion, WorkflowJob,
    WorkflowRun, WorkflowStatus,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fixture provider: runs newest-first, jobs keyed by run ID, with call logging
#[derive(Default)]
pub struct FixtureHistory {
    pub runs: Vec<WorkflowRun>,
    pub jobs: HashMap<u64, Vec<WorkflowJob>>,
    /// Fail job listing for this run ID
    pub fail_jobs_for: Option<u64>,
    /// Fail run listing on this page
    pub fail_runs_page: Option<u32>,
    /// Largest page the fixture serves, like the API's own limit
    pub page_cap: Option<u32>,
    pub run_calls: AtomicUsize,
    pub job_calls: Mutex<Vec<u64>>,
    pub pages_requested: Mutex<Vec<(Option<RunStatusFilter>, u32, u32)>>,
}

impl FixtureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run (call newest first) with its jobs
    pub fn with_run(mut self, run: WorkflowRun, jobs: Vec<WorkflowJob>) -> Self {
        self.jobs.insert(run.id, jobs);
        self.runs.push(run);
        self
    }

    /// Serve at most `cap` runs per page whatever was asked for
    pub fn with_page_cap(mut self, cap: u32) -> Self {
        self.page_cap = Some(cap);
        self
    }

    pub fn job_calls(&self) -> Vec<u64> {
        self.job_calls.lock().unwrap().clone()
    }

    pub fn pages_requested(&self) -> Vec<(Option<RunStatusFilter>, u32, u32)> {
        self.pages_requested.lock().unwrap().clone()
    }

    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    fn page_of_runs(
        &self,
        branch: &str,
        status: Option<RunStatusFilter>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<WorkflowRun>> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.pages_requested
            .lock()
            .unwrap()
            .push((status, page, per_page));

        if self.fail_runs_page == Some(page) {
            return Err(Error::Workflow("GitHub API returned error: 502".into()));
        }

        let filtered: Vec<WorkflowRun> = self
            .runs
            .iter()
            .filter(|r| r.branch == branch)
            .filter(|r| match status {
                None => true,
                Some(RunStatusFilter::Completed) => r.status == WorkflowStatus::Completed,
                Some(RunStatusFilter::Success) => {
                    r.status == WorkflowStatus::Completed
                        && r.conclusion == Some(WorkflowConclusion::Success)
                }
            })
            .cloned()
            .collect();

        let per_page = self.page_cap.map_or(per_page, |cap| per_page.min(cap));
        let start = ((page.max(1) - 1) * per_page) as usize;
        Ok(filtered
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect())
    }

    fn all_jobs(&self, run_id: u64) -> Result<Vec<WorkflowJob>> {
        self.job_calls.lock().unwrap().push(run_id);
        if self.fail_jobs_for == Some(run_id) {
            return Err(Error::RateLimitExceeded(
                "GitHub API rate limit exceeded. Remaining: 0".into(),
            ));
        }
        Ok(self.jobs.get(&run_id).cloned().unwrap_or_default())
    }
}

impl RunHistoryProvider for FixtureHistory {
    fn list_workflow_runs<'a>(
        &'a self,
        _repo: &'a RepoSlug,
        branch: &'a str,
        status: Option<RunStatusFilter>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<WorkflowRun>>> + Send + 'a {
        std::future::ready(self.page_of_runs(branch, status, page, per_page))
    }

    fn list_jobs_for_run<'a>(
        &'a self,
        _repo: &'a RepoSlug,
        run_id: u64,
    ) -> impl Future<Output = Result<Vec<WorkflowJob>>> + Send + 'a {
        std::future::ready(self.all_jobs(run_id))
    }
}

pub fn repo() -> RepoSlug {
    RepoSlug::parse("octo/hello").unwrap()
}

pub fn run(id: u64, sha: &str, status: WorkflowStatus, conclusion: Option<WorkflowConclusion>) -> WorkflowRun {
    WorkflowRun {
        id,
        name: "CI".to_string(),
        status,
        conclusion,
        branch: "main".to_string(),
        head_sha: sha.to_string(),
        created_at: 1_700_000_000 + id as i64,
    }
}

pub fn completed(id: u64, sha: &str, conclusion: WorkflowConclusion) -> WorkflowRun {
    run(id, sha, WorkflowStatus::Completed, Some(conclusion))
}

pub fn in_progress(id: u64, sha: &str) -> WorkflowRun {
    run(id, sha, WorkflowStatus::InProgress, None)
}

pub fn on_branch(mut run: WorkflowRun, branch: &str) -> WorkflowRun {
    run.branch = branch.to_string();
    run
}

pub fn job(run_id: u64, name: &str, conclusion: WorkflowConclusion) -> WorkflowJob {
    WorkflowJob {
        id: run_id * 100,
        name: name.to_string(),
        status: WorkflowStatus::Completed,
        conclusion: Some(conclusion),
        run_id,
    }
}

pub fn running_job(run_id: u64, name: &str) -> WorkflowJob {
    WorkflowJob {
        id: run_id * 100 + 1,
        name: name.to_string(),
        status: WorkflowStatus::InProgress,
        conclusion: None,
        run_id,
    }
}
