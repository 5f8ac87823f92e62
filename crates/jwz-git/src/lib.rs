//! Git integration for the jwz message store.
//!
//! Captures the source-control state attached to posted messages. Pure
//! with respect to the store: given a working directory it returns a
//! [`jwz_core::GitContext`] or nothing. Probes never fail the caller:
//! a message posts fine without version context, so every git error
//! collapses to `None`.

use std::path::Path;
use std::process::Command;

use jwz_core::GitContext;

/// Marker used for `head` when HEAD is not on a branch.
const DETACHED: &str = "detached";

/// Runs one git query and returns its trimmed stdout, or `None` when
/// git is missing, the command fails, or we are outside a repository.
fn probe(args: &[&str], cwd: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Captures the git state of `cwd`.
///
/// Returns `None` when `cwd` is not inside a git repository, the
/// repository has no commits yet, or `git` is not installed.
pub fn capture(cwd: &Path) -> Option<GitContext> {
    // No resolvable HEAD means no context at all.
    let oid = probe(&["rev-parse", "HEAD"], cwd)?;

    let head = match probe(&["symbolic-ref", "--short", "-q", "HEAD"], cwd) {
        Some(branch) if !branch.is_empty() => branch,
        _ => DETACHED.to_string(),
    };

    let dirty = probe(&["status", "--porcelain"], cwd)
        .map(|out| !out.is_empty())
        .unwrap_or(false);

    let prefix = probe(&["rev-parse", "--show-prefix"], cwd).unwrap_or_default();

    Some(GitContext {
        oid,
        head,
        dirty,
        prefix,
    })
}
