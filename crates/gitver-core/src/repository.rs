//! Read-only view of a repository.
//!
//! The engine never talks to git directly. It reads commits, branches and tags
//! through [`RepositorySnapshot`]. [`InMemoryRepository`] is the snapshot
//! implementation used by both the git adapter (which loads one eagerly) and
//! the tests (which build one by hand).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A commit in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit sha.
    pub sha: String,
    /// Parent shas, first parent first.
    pub parents: Vec<String>,
    /// Full commit message.
    pub message: String,
    /// Committer timestamp.
    pub when: DateTime<FixedOffset>,
}

impl Commit {
    /// Whether this commit has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Seven-character abbreviation of the sha.
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }

    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name, e.g. `release/2.0` or `origin/main`.
    pub name: String,
    /// Sha of the branch tip. `None` for an unborn branch.
    pub tip: Option<String>,
    /// Whether this is a remote-tracking branch.
    pub is_remote: bool,
}

impl Branch {
    /// Create a local branch pointing at `tip`.
    pub fn new(name: impl Into<String>, tip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tip: Some(tip.into()),
            is_remote: false,
        }
    }

    /// The branch name without a leading `origin/`-style remote segment.
    pub fn friendly_name(&self) -> &str {
        if self.is_remote {
            self.name.split_once('/').map_or(&self.name, |(_, rest)| rest)
        } else {
            &self.name
        }
    }
}

/// A tag and the commit it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name, e.g. `v1.2.0`.
    pub name: String,
    /// Sha of the (peeled) target commit.
    pub target: String,
}

/// Read-only access to repository facts.
///
/// Implementations must be deterministic: the same snapshot always answers
/// the same way.
pub trait RepositorySnapshot {
    /// All branches.
    fn branches(&self) -> Vec<Branch>;

    /// All tags.
    fn tags(&self) -> Vec<Tag>;

    /// Look up a commit by full sha.
    fn commit(&self, sha: &str) -> Option<Commit>;

    /// Commits reachable from `to` but not from `from_exclusive`, newest first.
    fn commit_log(&self, from_exclusive: Option<&Commit>, to: &Commit) -> Vec<Commit>;

    /// Best common ancestor of two branches.
    fn find_merge_base(&self, a: &Branch, b: &Branch) -> Option<Commit>;

    /// The checked-out branch.
    fn current_branch(&self) -> Branch;

    /// The checked-out commit.
    fn current_commit(&self) -> Commit;

    /// Number of changed paths in the working tree.
    fn uncommitted_change_count(&self) -> u64;

    /// Whether `ancestor` is reachable from (or equal to) `descendant`.
    fn is_ancestor(&self, ancestor: &Commit, descendant: &Commit) -> bool {
        ancestor == descendant
            || self
                .commit_log(None, descendant)
                .iter()
                .any(|c| c.sha == ancestor.sha)
    }

    /// First-parent chain from `to` back to the root, newest first.
    fn first_parent_chain(&self, to: &Commit) -> Vec<Commit> {
        let mut chain = vec![to.clone()];
        let mut next = to.parents.first().cloned();
        while let Some(sha) = next {
            let Some(commit) = self.commit(&sha) else {
                break;
            };
            next = commit.parents.first().cloned();
            chain.push(commit);
        }
        chain
    }
}

/// A fully materialized snapshot.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    commits: HashMap<String, Commit>,
    branches: Vec<Branch>,
    tags: Vec<Tag>,
    head: String,
    current_branch: Branch,
    uncommitted: u64,
}

impl InMemoryRepository {
    /// Assemble a snapshot from its parts.
    ///
    /// `head` must be the sha of a commit in `commits`.
    pub fn new(
        commits: impl IntoIterator<Item = Commit>,
        branches: Vec<Branch>,
        tags: Vec<Tag>,
        current_branch: Branch,
        head: impl Into<String>,
        uncommitted: u64,
    ) -> Self {
        Self {
            commits: commits.into_iter().map(|c| (c.sha.clone(), c)).collect(),
            branches,
            tags,
            head: head.into(),
            current_branch,
            uncommitted,
        }
    }

    /// Return a copy with a different checked-out branch.
    ///
    /// HEAD moves to the branch tip when it has one.
    #[must_use]
    pub fn checkout(mut self, branch: Branch) -> Self {
        if let Some(ref tip) = branch.tip
            && self.commits.contains_key(tip)
        {
            self.head.clone_from(tip);
        }
        self.current_branch = branch;
        self
    }

    /// Number of commits in the snapshot.
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the snapshot holds no commits.
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    fn ancestors(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(sha) = stack.pop() {
            if !seen.insert(sha.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&sha) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }

    /// Sort newest first; ties keep a stable sha order.
    fn sorted(&self, shas: impl IntoIterator<Item = String>) -> Vec<Commit> {
        let mut commits: Vec<Commit> = shas
            .into_iter()
            .filter_map(|sha| self.commits.get(&sha).cloned())
            .collect();
        commits.sort_by(|a, b| b.when.cmp(&a.when).then_with(|| a.sha.cmp(&b.sha)));
        commits
    }
}

impl RepositorySnapshot for InMemoryRepository {
    fn branches(&self) -> Vec<Branch> {
        self.branches.clone()
    }

    fn tags(&self) -> Vec<Tag> {
        self.tags.clone()
    }

    fn commit(&self, sha: &str) -> Option<Commit> {
        self.commits.get(sha).cloned()
    }

    fn commit_log(&self, from_exclusive: Option<&Commit>, to: &Commit) -> Vec<Commit> {
        let mut reachable = self.ancestors(&to.sha);
        if let Some(from) = from_exclusive {
            let excluded = self.ancestors(&from.sha);
            reachable.retain(|sha| !excluded.contains(sha));
        }
        self.sorted(reachable)
    }

    fn find_merge_base(&self, a: &Branch, b: &Branch) -> Option<Commit> {
        let (a_tip, b_tip) = (a.tip.as_deref()?, b.tip.as_deref()?);
        let theirs = self.ancestors(b_tip);
        self.sorted(self.ancestors(a_tip))
            .into_iter()
            .find(|c| theirs.contains(&c.sha))
    }

    fn current_branch(&self) -> Branch {
        self.current_branch.clone()
    }

    fn current_commit(&self) -> Commit {
        self.commits.get(&self.head).cloned().unwrap_or_else(|| Commit {
            sha: self.head.clone(),
            parents: Vec::new(),
            message: String::new(),
            when: DateTime::<chrono::Utc>::UNIX_EPOCH.fixed_offset(),
        })
    }

    fn uncommitted_change_count(&self) -> u64 {
        self.uncommitted
    }

    fn is_ancestor(&self, ancestor: &Commit, descendant: &Commit) -> bool {
        self.ancestors(&descendant.sha).contains(&ancestor.sha)
    }
}

/// Builder for hand-made snapshots in tests.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use chrono::TimeZone;

    /// Builds a linear-or-branching history with predictable shas and times.
    ///
    /// Each commit gets sha `<label>` padded to 40 characters and a timestamp
    /// one minute after the previous commit.
    #[derive(Default)]
    pub struct RepoBuilder {
        commits: Vec<Commit>,
        branches: Vec<Branch>,
        tags: Vec<Tag>,
        uncommitted: u64,
    }

    pub fn sha(label: &str) -> String {
        format!("{label:0<40}")
    }

    impl RepoBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a commit with the given parents (labels).
        pub fn commit(mut self, label: &str, parents: &[&str], message: &str) -> Self {
            let minutes = i64::try_from(self.commits.len()).unwrap_or_default();
            let when = chrono::FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .unwrap()
                + chrono::Duration::minutes(minutes);
            self.commits.push(Commit {
                sha: sha(label),
                parents: parents.iter().map(|p| sha(p)).collect(),
                message: message.to_string(),
                when,
            });
            self
        }

        pub fn branch(mut self, name: &str, tip: &str) -> Self {
            self.branches.push(Branch::new(name, sha(tip)));
            self
        }

        pub fn tag(mut self, name: &str, target: &str) -> Self {
            self.tags.push(Tag {
                name: name.to_string(),
                target: sha(target),
            });
            self
        }

        pub const fn uncommitted(mut self, count: u64) -> Self {
            self.uncommitted = count;
            self
        }

        /// Finish with `branch` checked out.
        pub fn on(self, branch: &str) -> InMemoryRepository {
            let current = self
                .branches
                .iter()
                .find(|b| b.name == branch)
                .cloned()
                .unwrap_or_else(|| panic!("no branch {branch}"));
            let head = current.tip.clone().unwrap();
            InMemoryRepository::new(
                self.commits,
                self.branches,
                self.tags,
                current,
                head,
                self.uncommitted,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::{RepoBuilder, sha};
    use super::*;

    // a - b - c - f (main)
    //      \     /
    //       d - e (feature/x)
    fn repo() -> InMemoryRepository {
        RepoBuilder::new()
            .commit("a", &[], "initial")
            .commit("b", &["a"], "second")
            .commit("c", &["b"], "third")
            .commit("d", &["b"], "feature work")
            .commit("e", &["d"], "more feature work")
            .commit("f", &["c", "e"], "Merge branch 'feature/x'")
            .branch("main", "f")
            .branch("feature/x", "e")
            .on("main")
    }

    fn shas(commits: &[Commit]) -> Vec<String> {
        commits.iter().map(|c| c.sha.clone()).collect()
    }

    #[test]
    fn commit_log_is_newest_first() {
        let repo = repo();
        let log = repo.commit_log(None, &repo.current_commit());
        assert_eq!(
            shas(&log),
            vec![sha("f"), sha("e"), sha("d"), sha("c"), sha("b"), sha("a")]
        );
    }

    #[test]
    fn commit_log_excludes_from_ancestry() {
        let repo = repo();
        let from = repo.commit(&sha("c")).unwrap();
        let log = repo.commit_log(Some(&from), &repo.current_commit());
        assert_eq!(shas(&log), vec![sha("f"), sha("e"), sha("d")]);
    }

    #[test]
    fn merge_base_of_diverged_branches() {
        let repo = repo().checkout(Branch::new("feature/x", sha("e")));
        let main = Branch::new("main", sha("c"));
        let base = repo.find_merge_base(&main, &repo.current_branch()).unwrap();
        assert_eq!(base.sha, sha("b"));
    }

    #[test]
    fn merge_base_of_unborn_branch_is_none() {
        let repo = repo();
        let unborn = Branch {
            name: "orphan".into(),
            tip: None,
            is_remote: false,
        };
        assert!(repo.find_merge_base(&unborn, &repo.current_branch()).is_none());
    }

    #[test]
    fn ancestry() {
        let repo = repo();
        let b = repo.commit(&sha("b")).unwrap();
        let e = repo.commit(&sha("e")).unwrap();
        let c = repo.commit(&sha("c")).unwrap();
        assert!(repo.is_ancestor(&b, &e));
        assert!(!repo.is_ancestor(&c, &e));
        assert!(repo.is_ancestor(&e, &e));
    }

    #[test]
    fn first_parent_chain_skips_merged_side() {
        let repo = repo();
        let chain = repo.first_parent_chain(&repo.current_commit());
        assert_eq!(shas(&chain), vec![sha("f"), sha("c"), sha("b"), sha("a")]);
    }

    #[test]
    fn commit_helpers() {
        let repo = repo();
        let head = repo.current_commit();
        assert!(head.is_merge());
        assert_eq!(head.short_sha(), "f000000");
        assert_eq!(head.subject(), "Merge branch 'feature/x'");
    }

    #[test]
    fn friendly_name_strips_remote() {
        let remote = Branch {
            name: "origin/release/1.0".into(),
            tip: None,
            is_remote: true,
        };
        assert_eq!(remote.friendly_name(), "release/1.0");
        assert_eq!(Branch::new("release/1.0", "x").friendly_name(), "release/1.0");
    }
}
