use std::collections::HashSet;

use super::{BaseVersion, Candidates, VersionStrategy, VersionStrategyKind};
use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;

/// Proposes the versions of reachable tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedCommit;

impl VersionStrategy for TaggedCommit {
    fn kind(&self) -> VersionStrategyKind {
        VersionStrategyKind::TaggedCommit
    }

    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        _effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        let mut seen = HashSet::new();
        Box::new(
            ctx.reachable_version_tags()
                .into_iter()
                .filter(move |t| seen.insert(t.version.clone()))
                .map(move |t| BaseVersion {
                    source: format!("Git tag '{}'", t.tag.name),
                    should_increment: t.commit.sha != ctx.current_commit.sha,
                    semantic_version: t.version,
                    base_version_source: Some(t.commit),
                    branch_name_override: None,
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

    #[test]
    fn yields_reachable_tags_oldest_first() {
        let repo = RepoBuilder::new()
            .commit("a", &[], "one")
            .commit("b", &["a"], "two")
            .commit("c", &["b"], "three")
            .branch("main", "c")
            .tag("v1.0.0", "a")
            .tag("1.1.0", "b")
            .tag("release-notes", "b")
            .on("main");
        let compiled = Compiled::new(Config::default());
        let ctx = compiled.context(&repo);
        let effective = ctx.effective_configuration().unwrap();

        let found: Vec<_> = TaggedCommit.base_versions(&ctx, &effective).collect();
        let versions: Vec<_> = found.iter().map(|b| b.semantic_version.clone()).collect();
        assert_eq!(versions, [SemanticVersion::new(1, 0, 0), SemanticVersion::new(1, 1, 0)]);
        assert_eq!(found[1].source, "Git tag '1.1.0'");
        assert!(found.iter().all(|b| b.should_increment));
    }

    #[test]
    fn tag_on_current_commit_does_not_increment() {
        let repo = RepoBuilder::new()
            .commit("a", &[], "one")
            .branch("main", "a")
            .tag("v2.0.0", "a")
            .on("main");
        let compiled = Compiled::new(Config::default());
        let ctx = compiled.context(&repo);
        let effective = ctx.effective_configuration().unwrap();

        let found: Vec<_> = TaggedCommit.base_versions(&ctx, &effective).collect();
        assert_eq!(found.len(), 1);
        assert!(!found[0].should_increment);
        assert_eq!(found[0].base_version_source.as_ref().map(|c| c.sha.clone()), Some(sha("a")));
    }

    #[test]
    fn duplicate_versions_keep_oldest_anchor() {
        let repo = RepoBuilder::new()
            .commit("a", &[], "one")
            .commit("b", &["a"], "two")
            .branch("main", "b")
            .tag("v1.0.0", "a")
            .tag("1.0.0", "b")
            .on("main");
        let compiled = Compiled::new(Config::default());
        let ctx = compiled.context(&repo);
        let effective = ctx.effective_configuration().unwrap();

        let found: Vec<_> = TaggedCommit.base_versions(&ctx, &effective).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, "Git tag 'v1.0.0'");
    }
}
