//! Current branch resolution from the triggering event

use crate::error::{Error, Result};
use crate::types::EventContext;

/// Events whose branch is the pull request head rather than `GITHUB_REF`
const PULL_REQUEST_EVENTS: [&str; 2] = ["pull_request", "pull_request_target"];

/// Whether the event name denotes a pull request
#[inline]
pub fn is_pull_request_event(event_name: &str) -> bool {
    PULL_REQUEST_EVENTS.contains(&event_name)
}

/// Resolve the branch the current run belongs to.
///
/// - Pull request events: the PR head ref (`GITHUB_HEAD_REF`)
/// - Everything else: the name part of `<kind>/<qualifier>/<name>` (`refs/heads/main` -> `main`)
///
/// Branch names containing `/` are kept whole (`refs/heads/feat/x` -> `feat/x`).
pub fn resolve_branch(event: &EventContext<'_>) -> Result<String> {
    let event_name = event.event_name.as_deref().unwrap_or("");

    if is_pull_request_event(event_name) {
        let head_ref = event
            .head_ref
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "head_ref is required for {} events but was not supplied",
                    event_name
                ))
            })?;
        return Ok(head_ref.to_string());
    }

    let git_ref = event
        .git_ref
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| Error::missing_input("ref"))?;

    branch_from_ref(git_ref)
}

/// Take the name part of a three-segment ref path
pub fn branch_from_ref(git_ref: &str) -> Result<String> {
    let mut parts = git_ref.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(name)) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::Config(format!(
            "ref must have the form <kind>/<qualifier>/<name>: {}",
            git_ref
        ))),
    }
}
