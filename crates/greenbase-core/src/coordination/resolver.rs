//! Last-green commit resolution over a run history provider

use crate::error::{Error, Result};
use crate::traits::RunHistoryProvider;
use crate::types::{
    NoMatchFallback, RepoSlug, Resolution, ResolutionSource, ResolveConfig, RunStatusFilter,
    WorkflowJob,
};

/// Whether any job record in the run is a successful instance of `job_name`.
///
/// Re-run attempts may list the same job several times; one success is enough,
/// regardless of where it sits among the run's jobs.
#[inline]
pub fn run_contains_success(jobs: &[WorkflowJob], job_name: &str) -> bool {
    jobs.iter().any(|job| job.succeeded_as(job_name))
}

/// Resolves the commit of the newest green run (or green job) on a branch
pub struct CommitResolver<'a, P> {
    provider: P,
    repo: &'a RepoSlug,
    config: &'a ResolveConfig<'a>,
}

impl<'a, P: RunHistoryProvider> CommitResolver<'a, P> {
    /// Create a new resolver
    pub fn new(provider: P, repo: &'a RepoSlug, config: &'a ResolveConfig<'a>) -> Self {
        Self {
            provider,
            repo,
            config,
        }
    }

    /// Main entry point: pick the mode from the configured job name
    pub async fn resolve(&self, branch: &str) -> Result<Resolution> {
        match self.config.job_name() {
            Some(job_name) => self.resolve_job_success(branch, job_name).await,
            None => self.resolve_latest_successful_run(branch).await,
        }
    }

    /// Head commit of the newest successful run on `branch`, or empty
    pub async fn resolve_latest_successful_run(&self, branch: &str) -> Result<Resolution> {
        let runs = self
            .provider
            .list_workflow_runs(self.repo, branch, Some(RunStatusFilter::Success), 1, 1)
            .await?;

        match runs.into_iter().next() {
            Some(run) => {
                tracing::info!(
                    run_id = run.id,
                    workflow = %run.name,
                    created_at = run.created_at,
                    sha = %run.head_sha,
                    "Latest successful run on {}", branch
                );
                Ok(Resolution {
                    sha: run.head_sha,
                    source: ResolutionSource::LatestSuccessfulRun { run_id: run.id },
                })
            }
            None => {
                tracing::info!("No successful run found on {}", branch);
                Ok(Resolution::not_found())
            }
        }
    }

    /// Head commit of the newest completed run in which `job_name` succeeded.
    ///
    /// Pages are fetched lazily and runs scanned newest-first; the first match
    /// stops the scan, so older runs' jobs and later pages are never requested.
    pub async fn resolve_job_success(&self, branch: &str, job_name: &str) -> Result<Resolution> {
        let per_page = self.config.page_size();
        let status = self
            .config
            .prefilter_completed
            .then_some(RunStatusFilter::Completed);

        // Newest run seen on the branch, kept for the NewestRun fallback
        let mut newest: Option<(u64, String)> = None;
        let mut scanned = 0usize;
        let mut page = 1u32;

        loop {
            if page > self.config.max_pages {
                return Err(Error::Config(format!(
                    "Run history on {} exceeds {} pages of {} runs; raise max_pages",
                    branch, self.config.max_pages, per_page
                )));
            }

            let runs = self
                .provider
                .list_workflow_runs(self.repo, branch, status, page, per_page)
                .await?;
            let page_len = runs.len();
            tracing::debug!(page, runs = page_len, "Fetched workflow runs for {}", branch);

            for run in runs {
                if newest.is_none() {
                    newest = Some((run.id, run.head_sha.clone()));
                }
                if !run.is_completed() {
                    tracing::debug!(run_id = run.id, status = run.status.as_str(), "Skipping run");
                    continue;
                }

                scanned += 1;
                let jobs = self.provider.list_jobs_for_run(self.repo, run.id).await?;
                if run_contains_success(&jobs, job_name) {
                    tracing::info!(
                        run_id = run.id,
                        workflow = %run.name,
                        created_at = run.created_at,
                        run_conclusion = run.conclusion.map_or("none", |c| c.as_str()),
                        sha = %run.head_sha,
                        "Job '{}' last succeeded on {}", job_name, branch
                    );
                    return Ok(Resolution {
                        sha: run.head_sha,
                        source: ResolutionSource::JobSucceeded { run_id: run.id },
                    });
                }
            }

            if page_len < per_page as usize {
                break;
            }
            page += 1;
        }

        tracing::debug!(scanned, "Scanned completed runs without a match");
        Ok(self.no_match(job_name, branch, newest))
    }

    fn no_match(&self, job_name: &str, branch: &str, newest: Option<(u64, String)>) -> Resolution {
        match (self.config.fallback, newest) {
            (NoMatchFallback::NewestRun, Some((run_id, sha))) => {
                tracing::warn!(
                    run_id,
                    sha = %sha,
                    "Job '{}' never succeeded on {}, defaulting to the newest run's commit",
                    job_name,
                    branch
                );
                Resolution {
                    sha,
                    source: ResolutionSource::NewestRunFallback { run_id },
                }
            }
            _ => {
                tracing::warn!("Job '{}' never succeeded on {}", job_name, branch);
                Resolution::not_found()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{WorkflowConclusion, WorkflowStatus};

    fn job(name: &str, conclusion: WorkflowConclusion) -> WorkflowJob {
        WorkflowJob {
            id: 1,
            name: name.to_string(),
            status: WorkflowStatus::Completed,
            conclusion: Some(conclusion),
            run_id: 1,
        }
    }

    #[test]
    fn test_run_contains_success_empty() {
        assert!(!run_contains_success(&[], "build"));
    }

    #[test]
    fn test_run_contains_success_other_job() {
        let jobs = [job("lint", WorkflowConclusion::Success)];
        assert!(!run_contains_success(&jobs, "build"));
    }

    #[test]
    fn test_run_contains_success_rerun_order_independent() {
        let failed_then_ok = [
            job("build", WorkflowConclusion::Failure),
            job("build", WorkflowConclusion::Success),
        ];
        let ok_then_failed = [
            job("build", WorkflowConclusion::Success),
            job("build", WorkflowConclusion::Failure),
        ];
        assert!(run_contains_success(&failed_then_ok, "build"));
        assert!(run_contains_success(&ok_then_failed, "build"));
    }

    #[test]
    fn test_run_contains_success_cancelled() {
        let jobs = [
            job("build", WorkflowConclusion::Cancelled),
            job("build", WorkflowConclusion::Skipped),
        ];
        assert!(!run_contains_success(&jobs, "build"));
    }
}
