//! Git adapter.
//!
//! Shells out to `git` to load an [`InMemoryRepository`] snapshot of a
//! working copy. This is the only module that runs processes; everything it
//! reads is collected up front so the engine never touches git again.

use std::process::Command;

use camino::Utf8Path;
use chrono::DateTime;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::repository::{Branch, Commit, InMemoryRepository, Tag};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// Output from git could not be understood.
    #[error("unexpected git output: {0}")]
    Parse(String),

    /// The repository has no commits yet.
    #[error("repository has no commits")]
    NoCommits,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Field separator inside a log record.
const FIELD: char = '\u{1f}';

const LOG_FORMAT: &str = "--format=%H%x1f%P%x1f%cI%x1f%B";

const REF_FORMAT: &str = "--format=%(refname)%00%(objectname)%00%(*objectname)";

/// Whether a `git` executable is on `PATH`.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Check if `dir` is inside a git working tree.
#[instrument]
pub fn is_inside_repo(dir: &Utf8Path) -> GitResult<bool> {
    match git(dir, &["rev-parse", "--is-inside-work-tree"]) {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Load a snapshot of the repository containing `dir`.
///
/// Reads every commit reachable from any ref, all local and remote-tracking
/// branches, all tags (peeled), the checked-out branch and the number of
/// changed paths in the working tree.
///
/// # Errors
///
/// Returns [`GitError::NotARepo`] outside a repository and
/// [`GitError::NoCommits`] for a repository without commits.
#[instrument]
pub fn load_snapshot(dir: &Utf8Path) -> GitResult<InMemoryRepository> {
    if !is_inside_repo(dir)? {
        return Err(GitError::NotARepo);
    }

    let head = match git(dir, &["rev-parse", "--verify", "HEAD"]) {
        Ok(sha) => sha.trim().to_string(),
        Err(GitError::Command { .. }) => return Err(GitError::NoCommits),
        Err(e) => return Err(e),
    };

    let commits = parse_log(&git(dir, &["log", "--all", "-z", LOG_FORMAT])?)?;
    let (branches, tags) = parse_refs(&git(
        dir,
        &["for-each-ref", REF_FORMAT, "refs/heads", "refs/remotes", "refs/tags"],
    )?);

    let abbrev = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let current = current_branch(abbrev.trim(), &head, &branches);

    let uncommitted = git(dir, &["status", "--porcelain"])?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count() as u64;

    debug!(
        commits = commits.len(),
        branches = branches.len(),
        tags = tags.len(),
        branch = %current.name,
        uncommitted,
        "snapshot loaded"
    );
    Ok(InMemoryRepository::new(
        commits,
        branches,
        tags,
        current,
        head,
        uncommitted,
    ))
}

/// The checked-out branch; a detached HEAD is reported as branch `HEAD`.
fn current_branch(abbrev: &str, head: &str, branches: &[Branch]) -> Branch {
    branches
        .iter()
        .find(|b| !b.is_remote && b.name == abbrev)
        .cloned()
        .unwrap_or_else(|| Branch::new(abbrev, head))
}

/// Parse `git log -z` output in [`LOG_FORMAT`].
fn parse_log(output: &str) -> GitResult<Vec<Commit>> {
    output
        .split('\0')
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.is_empty())
        .map(parse_commit)
        .collect()
}

fn parse_commit(record: &str) -> GitResult<Commit> {
    let mut fields = record.splitn(4, FIELD);
    let (Some(sha), Some(parents), Some(date), Some(message)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(GitError::Parse(format!("incomplete log record: {record:?}")));
    };
    let when = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|e| GitError::Parse(format!("bad commit date {date:?}: {e}")))?;
    Ok(Commit {
        sha: sha.trim().to_string(),
        parents: parents.split_whitespace().map(str::to_string).collect(),
        message: message.trim_end().to_string(),
        when,
    })
}

/// Parse `git for-each-ref` output in [`REF_FORMAT`].
fn parse_refs(output: &str) -> (Vec<Branch>, Vec<Tag>) {
    let mut branches = Vec::new();
    let mut tags = Vec::new();
    for line in output.lines().filter(|l| !l.is_empty()) {
        let mut fields = line.split('\0');
        let refname = fields.next().unwrap_or_default();
        let object = fields.next().unwrap_or_default().to_string();
        let peeled = fields.next().unwrap_or_default();

        if let Some(name) = refname.strip_prefix("refs/heads/") {
            branches.push(Branch::new(name, object));
        } else if let Some(name) = refname.strip_prefix("refs/remotes/") {
            if name.ends_with("/HEAD") {
                continue;
            }
            branches.push(Branch {
                name: name.to_string(),
                tip: Some(object),
                is_remote: true,
            });
        } else if let Some(name) = refname.strip_prefix("refs/tags/") {
            let target = if peeled.is_empty() { object } else { peeled.to_string() };
            tags.push(Tag {
                name: name.to_string(),
                target,
            });
        }
    }
    (branches, tags)
}

/// Run a git command in `dir` and return its stdout.
fn git(dir: &Utf8Path, args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").arg("-C").arg(dir).args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Detect "not a git repo" specifically
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
