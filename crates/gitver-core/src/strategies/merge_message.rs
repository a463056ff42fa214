use super::{BaseVersion, Candidates, VersionStrategy, VersionStrategyKind};
use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;

/// Proposes versions named in merge commit messages.
///
/// Walks the non-ignored history of the current commit, newest first, and
/// yields one candidate per merge commit whose merged branch carries a
/// version.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeMessageStrategy;

impl VersionStrategy for MergeMessageStrategy {
    fn kind(&self) -> VersionStrategyKind {
        VersionStrategyKind::MergeMessage
    }

    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        let should_increment = !effective.prevent_increment_of_merged_branch_version;
        Box::new(
            ctx.commit_log(None)
                .into_iter()
                .filter(|commit| commit.is_merge())
                .filter_map(move |commit| {
                    let version = ctx.classifier.classify(&commit.message).version?;
                    Some(BaseVersion {
                        source: format!("Merge message '{}'", commit.subject()),
                        should_increment,
                        semantic_version: version,
                        base_version_source: Some(commit),
                        branch_name_override: None,
                    })
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::fixture::Compiled;
    use crate::repository::fixture::{RepoBuilder, sha};
    use crate::version::SemanticVersion;

    // a - m1 ------ m2 (main)
    //  \   /       /
    //   r1        r2
    fn repo() -> crate::repository::InMemoryRepository {
        RepoBuilder::new()
            .commit("a", &[], "initial")
            .commit("r1", &["a"], "release work")
            .commit("m1", &["a", "r1"], "Merge branch 'release/1.2.0'")
            .commit("r2", &["m1"], "more work")
            .commit("m2", &["m1", "r2"], "Merge pull request #7 from acme/feature/login")
            .commit("x", &["m2"], "Merge branch 'release/3.0.0' text only")
            .branch("main", "x")
            .on("main")
    }

    #[test]
    fn yields_versions_from_merge_commits_newest_first() {
        let repo = repo();
        let compiled = Compiled::new(Config::default());
        let ctx = compiled.context(&repo);
        let effective = ctx.effective_configuration().unwrap();

        let found: Vec<_> = MergeMessageStrategy.base_versions(&ctx, &effective).collect();
        assert_eq!(found.len(), 1, "only m1 is a merge carrying a version");
        let base = &found[0];
        assert_eq!(base.semantic_version, SemanticVersion::new(1, 2, 0));
        assert_eq!(base.base_version_source.as_ref().map(|c| c.sha.clone()), Some(sha("m1")));
        assert_eq!(base.source, "Merge message 'Merge branch 'release/1.2.0''");
        assert!(!base.should_increment, "main prevents incrementing merged versions");
    }

    #[test]
    fn increments_when_branch_allows() {
        let repo = repo();
        let mut config = Config::default();
        if let Some(main) = config.branches.get_mut("main") {
            main.prevent_increment_of_merged_branch_version = Some(false);
        }
        let compiled = Compiled::new(config);
        let ctx = compiled.context(&repo);
        let effective = ctx.effective_configuration().unwrap();

        let found: Vec<_> = MergeMessageStrategy.base_versions(&ctx, &effective).collect();
        assert!(found[0].should_increment);
    }

    #[test]
    fn disabled_strategy_yields_nothing() {
        let repo = repo();
        let mut config = Config::default();
        config.version_strategies.remove(VersionStrategyKind::MergeMessage);
        let compiled = Compiled::new(config);
        let ctx = compiled.context(&repo);
        let effective = ctx.effective_configuration().unwrap();

        assert_eq!(MergeMessageStrategy.base_versions(&ctx, &effective).count(), 0);
        assert_eq!(MergeMessageStrategy.candidates(&ctx, &effective).count(), 1);
    }
}
