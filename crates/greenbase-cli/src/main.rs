#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Context;
use clap::Parser;
use greenbase_core::http::DEFAULT_API_URL;
use greenbase_core::{
    resolve_commit, EventContext, GitHubRunHistory, NoMatchFallback, OutputWriter, RepoSlug,
    Resolution, ResolveConfig, ResultSink,
};
use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Output key holding the resolved commit
const SHA_KEY: &str = "sha";

#[derive(Parser)]
#[command(
    name = "greenbase",
    version,
    about = "Commit of the last green run or job on the current branch"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Resolve the base commit and write it as the `sha` output
    Resolve(ResolveArgs),
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// Job that must have succeeded (empty: latest successful run)
    #[arg(long, env = "INPUT_JOB")]
    job: Option<String>,

    /// GitHub token for API access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Repository as owner/name
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Triggering event name
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: Option<String>,

    /// Pull request head branch
    #[arg(long, env = "GITHUB_HEAD_REF")]
    head_ref: Option<String>,

    /// Full ref path (refs/heads/<branch>)
    #[arg(long = "ref", env = "GITHUB_REF")]
    git_ref: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Result when the job never succeeded: empty or newest-run
    #[arg(long, env = "INPUT_FALLBACK", default_value = "empty")]
    fallback: String,

    /// Only list completed runs while scanning for the job
    #[arg(long, env = "INPUT_COMPLETED_ONLY")]
    completed_only: bool,

    /// Limit runs to one workflow (file name or ID)
    #[arg(long, env = "INPUT_WORKFLOW")]
    workflow: Option<String>,

    /// Runs fetched per page
    #[arg(long, env = "GREENBASE_PER_PAGE", default_value_t = 100)]
    per_page: u32,

    /// Maximum pages of run history to scan
    #[arg(long, env = "GREENBASE_MAX_PAGES", default_value_t = 1000)]
    max_pages: u32,

    /// Output format: gha, json, text (default: auto-detect)
    #[arg(long, env = "GREENBASE_OUTPUT_FORMAT")]
    output_format: Option<String>,

    /// GitHub Actions output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,
}

/// Output format for the CLI
#[derive(Debug, PartialEq, Eq)]
enum OutputFormat {
    /// GitHub Actions: append to $GITHUB_OUTPUT
    Gha,
    /// JSON object to stdout
    Json,
    /// `sha=<value>` to stdout
    Text,
}

impl OutputFormat {
    fn detect(explicit: Option<&str>, in_actions: bool) -> Self {
        match explicit {
            Some("gha") => OutputFormat::Gha,
            Some("json") => OutputFormat::Json,
            Some("text") => OutputFormat::Text,
            _ => {
                if in_actions {
                    OutputFormat::Gha
                } else {
                    OutputFormat::Text
                }
            }
        }
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Resolve(args) => match run_resolve(args) {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!("{e:#}");
                1
            }
        },
    };
    std::process::exit(code);
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level
fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Filter empty string from Option (env vars may produce "" for empty values)
fn clean_opt(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

fn required<'a>(v: &'a Option<String>, field: &str) -> greenbase_core::Result<&'a str> {
    clean_opt(v).ok_or_else(|| greenbase_core::Error::missing_input(field))
}

/// Inputs gathered once from arguments and environment
struct Inputs<'a> {
    repo: RepoSlug,
    token: &'a str,
    api_url: &'a str,
    workflow: Option<&'a str>,
    event: EventContext<'a>,
    config: ResolveConfig<'a>,
}

fn gather_inputs(args: &ResolveArgs) -> greenbase_core::Result<Inputs<'_>> {
    let token = required(&args.token, "token")?;
    let repo = RepoSlug::parse(required(&args.repository, "repository")?)?;

    let event = EventContext {
        event_name: clean_opt(&args.event_name).map(Cow::Borrowed),
        head_ref: clean_opt(&args.head_ref).map(Cow::Borrowed),
        git_ref: clean_opt(&args.git_ref).map(Cow::Borrowed),
    };

    let config = ResolveConfig {
        job: clean_opt(&args.job).map(Cow::Borrowed),
        fallback: NoMatchFallback::parse(args.fallback.trim())?,
        prefilter_completed: args.completed_only,
        per_page: args.per_page,
        max_pages: args.max_pages.max(1),
    };

    Ok(Inputs {
        repo,
        token,
        api_url: clean_opt(&args.api_url).unwrap_or(DEFAULT_API_URL),
        workflow: clean_opt(&args.workflow),
        event,
        config,
    })
}

fn run_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let inputs = gather_inputs(&args)?;
    let output_format = OutputFormat::detect(
        args.output_format.as_deref(),
        std::env::var_os("GITHUB_ACTIONS").is_some(),
    );

    let provider = GitHubRunHistory::new(inputs.api_url, inputs.token)?
        .with_workflow(inputs.workflow.map(str::to_string));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;

    let (branch, resolution) = rt.block_on(resolve_commit(
        &provider,
        &inputs.repo,
        &inputs.event,
        &inputs.config,
    ))?;

    if resolution.is_found() {
        tracing::info!(
            source = resolution.source.as_str(),
            "Resolved base commit for {}: '{}'",
            branch,
            resolution.sha
        );
    } else {
        tracing::info!("No base commit for {}; emitting an empty sha", branch);
    }

    let report = Report {
        branch: &branch,
        job: inputs.config.job_name(),
        resolution: &resolution,
    };

    match output_format {
        OutputFormat::Gha => write_gha_output(&report, args.github_output.as_deref()),
        OutputFormat::Json => write_json_output(&report, std::io::stdout().lock()),
        OutputFormat::Text => {
            OutputWriter::new(std::io::stdout().lock()).emit(SHA_KEY, &resolution.sha)?;
            Ok(())
        }
    }
}

/// Resolution plus context for the output writers
struct Report<'a> {
    branch: &'a str,
    job: Option<&'a str>,
    resolution: &'a Resolution,
}

/// Append `sha=<value>` to $GITHUB_OUTPUT, or stdout when it is not set
fn write_gha_output(report: &Report<'_>, output_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let sha = &report.resolution.sha;
    match output_file.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => {
            OutputWriter::append_to(path)
                .and_then(|mut sink| sink.emit(SHA_KEY, sha))
                .with_context(|| format!("cannot write GITHUB_OUTPUT ({})", path.display()))?;
        }
        None => {
            tracing::warn!("GITHUB_OUTPUT not set, falling back to stdout");
            OutputWriter::new(std::io::stdout().lock()).emit(SHA_KEY, sha)?;
        }
    }
    Ok(())
}

/// Write a JSON object with the resolution
fn write_json_output<W: Write>(report: &Report<'_>, mut w: W) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "sha": report.resolution.sha,
        "branch": report.branch,
        "job": report.job,
        "source": report.resolution.source.as_str(),
        "run_id": report.resolution.source.run_id(),
    });

    serde_json::to_writer(&mut w, &output)?;
    writeln!(w)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenbase_core::{ErrorKind, ResolutionSource};

    fn args(extra: &[&str]) -> ResolveArgs {
        let mut argv = vec!["greenbase", "resolve"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Resolve(args) => args,
        }
    }

    #[test]
    fn test_output_format_detect() {
        assert_eq!(OutputFormat::detect(Some("json"), true), OutputFormat::Json);
        assert_eq!(OutputFormat::detect(Some("text"), true), OutputFormat::Text);
        assert_eq!(OutputFormat::detect(Some("gha"), false), OutputFormat::Gha);
        assert_eq!(OutputFormat::detect(None, true), OutputFormat::Gha);
        assert_eq!(OutputFormat::detect(None, false), OutputFormat::Text);
        assert_eq!(OutputFormat::detect(Some("yaml"), false), OutputFormat::Text);
    }

    #[test]
    fn test_clean_opt() {
        assert_eq!(clean_opt(&None), None);
        assert_eq!(clean_opt(&Some(String::new())), None);
        assert_eq!(clean_opt(&Some("  ".to_string())), None);
        assert_eq!(clean_opt(&Some("build".to_string())), Some("build"));
    }

    #[test]
    fn test_gather_inputs_full() {
        let args = args(&[
            "--token", "t0k",
            "--repository", "octo/hello",
            "--event-name", "push",
            "--ref", "refs/heads/main",
            "--job", "build",
            "--fallback", "newest-run",
            "--per-page", "500",
        ]);
        let inputs = gather_inputs(&args).unwrap();
        assert_eq!(inputs.repo.to_string(), "octo/hello");
        assert_eq!(inputs.token, "t0k");
        assert_eq!(inputs.config.job_name(), Some("build"));
        assert_eq!(inputs.config.fallback, NoMatchFallback::NewestRun);
        assert_eq!(inputs.config.per_page, 100);
        assert_eq!(inputs.event.git_ref.as_deref(), Some("refs/heads/main"));
    }

    #[test]
    fn test_gather_inputs_missing_token() {
        let args = args(&["--token", "", "--repository", "octo/hello"]);
        let err = gather_inputs(&args).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().contains("token"));
    }

    #[test]
    fn test_gather_inputs_bad_fallback() {
        let args = args(&["--token", "t", "--repository", "octo/hello", "--fallback", "oldest"]);
        assert_eq!(gather_inputs(&args).err().unwrap().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_write_json_output() {
        let resolution = Resolution {
            sha: "abc".to_string(),
            source: ResolutionSource::JobSucceeded { run_id: 42 },
        };
        let report = Report {
            branch: "main",
            job: Some("build"),
            resolution: &resolution,
        };
        let mut buf = Vec::new();
        write_json_output(&report, &mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["sha"], "abc");
        assert_eq!(value["branch"], "main");
        assert_eq!(value["job"], "build");
        assert_eq!(value["source"], "job_succeeded");
        assert_eq!(value["run_id"], 42);
    }

    #[test]
    fn test_write_gha_output_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("output");
        let resolution = Resolution::not_found();
        let report = Report {
            branch: "main",
            job: None,
            resolution: &resolution,
        };

        write_gha_output(&report, Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "sha=\n");
    }
}
