//! Provider capability trait for workflow run history

use crate::error::Result;
use crate::types::{RepoSlug, RunStatusFilter, WorkflowJob, WorkflowRun};
use std::future::Future;

/// Paginated source of workflow runs and jobs for a repository.
///
/// Runs are returned newest-first. The resolver only ever talks to this trait,
/// so the GitHub client and in-memory fixtures are interchangeable.
pub trait RunHistoryProvider {
    /// List one page of runs on `branch` (1-based `page`), optionally filtered by status
    fn list_workflow_runs<'a>(
        &'a self,
        repo: &'a RepoSlug,
        branch: &'a str,
        status: Option<RunStatusFilter>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<WorkflowRun>>> + Send + 'a;

    /// List every job belonging to a run, in provider order
    fn list_jobs_for_run<'a>(
        &'a self,
        repo: &'a RepoSlug,
        run_id: u64,
    ) -> impl Future<Output = Result<Vec<WorkflowJob>>> + Send + 'a;
}

impl<P: RunHistoryProvider> RunHistoryProvider for &P {
    fn list_workflow_runs<'a>(
        &'a self,
        repo: &'a RepoSlug,
        branch: &'a str,
        status: Option<RunStatusFilter>,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<Vec<WorkflowRun>>> + Send + 'a {
        (**self).list_workflow_runs(repo, branch, status, page, per_page)
    }

    fn list_jobs_for_run<'a>(
        &'a self,
        repo: &'a RepoSlug,
        run_id: u64,
    ) -> impl Future<Output = Result<Vec<WorkflowJob>>> + Send + 'a {
        (**self).list_jobs_for_run(repo, run_id)
    }
}
