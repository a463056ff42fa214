use super::{BaseVersion, Candidates, VersionInBranchName, VersionStrategy, VersionStrategyKind};
use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;

/// Proposes the versions of open release branches to branches that track
/// them, such as `develop`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackReleaseBranches;

impl VersionStrategy for TrackReleaseBranches {
    fn kind(&self) -> VersionStrategyKind {
        VersionStrategyKind::TrackReleaseBranches
    }

    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        if !effective.tracks_release_branches || !ctx.resolver.release_branches_configured() {
            return Box::new(std::iter::empty());
        }

        let current = &ctx.current_branch;
        Box::new(
            ctx.repository
                .branches()
                .into_iter()
                .filter(move |branch| branch.friendly_name() != current.friendly_name())
                .filter_map(move |branch| {
                    let release = ctx.resolver.resolve(&branch).ok()?;
                    if !release.is_release_branch {
                        return None;
                    }
                    let merge_base = ctx.repository.find_merge_base(&branch, current)?;
                    let base = VersionInBranchName::candidate_for(ctx, &branch, &release)?;
                    Some(BaseVersion {
                        source: format!("Release branch exists -> {}", base.source),
                        should_increment: true,
                        semantic_version: base.semantic_version,
                        base_version_source: Some(merge_base),
                        branch_name_override: None,
                    })
                }),
        )
    }
}
