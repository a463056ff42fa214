//! Per-calculation state shared by strategies and the calculator.

use crate::branch_config::{BranchConfigurationResolver, EffectiveBranchConfiguration};
use crate::config::Config;
use crate::error::ConfigResult;
use crate::increment::IncrementMarkers;
use crate::merge_message::MergeMessageClassifier;
use crate::repository::{Branch, Commit, RepositorySnapshot, Tag};
use crate::version::{SemanticVersion, TagPrefix};

/// A tag that parses as a version, with its resolved commit.
#[derive(Debug, Clone)]
pub struct VersionTag {
    /// The tag itself.
    pub tag: Tag,
    /// The commit the tag points at.
    pub commit: Commit,
    /// The version parsed from the tag name.
    pub version: SemanticVersion,
}

/// Everything a strategy may read during one calculation.
///
/// Holds borrowed, pre-compiled collaborators; building one never fails
/// except when resolving the current branch's configuration.
pub struct CalculationContext<'a> {
    /// The repository being versioned.
    pub repository: &'a dyn RepositorySnapshot,
    /// Configuration snapshot.
    pub config: &'a Config,
    /// Branch configuration resolver.
    pub resolver: &'a BranchConfigurationResolver,
    /// Merge message classifier.
    pub classifier: &'a MergeMessageClassifier,
    /// Increment marker patterns.
    pub markers: &'a IncrementMarkers,
    /// Compiled tag prefix.
    pub tag_prefix: &'a TagPrefix,
    /// Branch being versioned.
    pub current_branch: Branch,
    /// Commit being versioned.
    pub current_commit: Commit,
}

impl CalculationContext<'_> {
    /// Effective configuration for the current branch.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::ConfigError::NoBranchConfiguration`].
    pub fn effective_configuration(&self) -> ConfigResult<EffectiveBranchConfiguration> {
        self.resolver.resolve(&self.current_branch)
    }

    /// Whether the ignore policy excludes `commit`.
    pub fn is_ignored(&self, commit: &Commit) -> bool {
        self.config.ignore.is_ignored(commit)
    }

    /// Non-ignored commits after `from_exclusive` up to the current commit,
    /// newest first.
    pub fn commit_log(&self, from_exclusive: Option<&Commit>) -> Vec<Commit> {
        self.repository
            .commit_log(from_exclusive, &self.current_commit)
            .into_iter()
            .filter(|c| !self.is_ignored(c))
            .collect()
    }

    /// Number of non-ignored commits after `from_exclusive`.
    pub fn commits_since(&self, from_exclusive: Option<&Commit>) -> u64 {
        self.commit_log(from_exclusive).len() as u64
    }

    /// Tags on non-ignored commits reachable from the current commit and not
    /// newer than it, whose names parse as versions. Oldest commit first.
    pub fn reachable_version_tags(&self) -> Vec<VersionTag> {
        let mut tags: Vec<VersionTag> = self
            .repository
            .tags()
            .into_iter()
            .filter_map(|tag| {
                let version = SemanticVersion::parse(&tag.name, self.tag_prefix)?;
                let commit = self.repository.commit(&tag.target)?;
                Some(VersionTag {
                    tag,
                    commit,
                    version,
                })
            })
            .filter(|t| {
                t.commit.when <= self.current_commit.when
                    && !self.is_ignored(&t.commit)
                    && self.repository.is_ancestor(&t.commit, &self.current_commit)
            })
            .collect();
        tags.sort_by(|a, b| {
            a.commit
                .when
                .cmp(&b.commit.when)
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        tags
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::Compiled;
    use crate::config::Config;
    use crate::repository::fixture::{RepoBuilder, sha};
    use std::collections::BTreeSet;

    #[test]
    fn commit_log_skips_ignored() {
        let repo = RepoBuilder::new()
            .commit("a", &[], "one")
            .commit("b", &["a"], "two")
            .commit("c", &["b"], "three")
            .branch("main", "c")
            .on("main");
        let mut config = Config::default();
        config.ignore.shas = BTreeSet::from([sha("b")[..8].to_string()]);
        let compiled = Compiled::new(config);
        let ctx = compiled.context(&repo);

        let log: Vec<_> = ctx.commit_log(None).into_iter().map(|c| c.sha).collect();
        assert_eq!(log, vec![sha("c"), sha("a")]);
        assert_eq!(ctx.commits_since(None), 2);
    }

    #[test]
    fn reachable_tags_exclude_other_lines_and_non_versions() {
        // a - b (main)
        //  \
        //   c (other)
        let repo = RepoBuilder::new()
            .commit("a", &[], "one")
            .commit("b", &["a"], "two")
            .commit("c", &["a"], "three")
            .branch("main", "b")
            .branch("other", "c")
            .tag("v1.0.0", "a")
            .tag("not-a-version", "b")
            .tag("v9.0.0", "c")
            .on("main");
        let compiled = Compiled::new(Config::default());
        let ctx = compiled.context(&repo);

        let names: Vec<_> = ctx
            .reachable_version_tags()
            .into_iter()
            .map(|t| t.tag.name)
            .collect();
        assert_eq!(names, ["v1.0.0"]);
    }
}
