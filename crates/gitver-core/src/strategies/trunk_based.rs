use super::{BaseVersion, Candidates, VersionStrategy, VersionStrategyKind};
use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;
use crate::version::{SemanticVersion, VersionField};

/// Derives a version by incrementing once per mainline commit.
///
/// Only used when no reachable tag carries a version.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrunkBased;

impl VersionStrategy for TrunkBased {
    fn kind(&self) -> VersionStrategyKind {
        VersionStrategyKind::TrunkBased
    }

    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        if !ctx.reachable_version_tags().is_empty() {
            return Box::new(std::iter::empty());
        }

        let fallback = match effective.increment {
            VersionField::None => VersionField::Patch,
            field => field,
        };
        let mut version = SemanticVersion::new(0, 0, 0);
        let mut count = 0_u64;
        for commit in ctx
            .repository
            .first_parent_chain(&ctx.current_commit)
            .iter()
            .rev()
            .filter(|c| !ctx.is_ignored(c))
        {
            let field = ctx
                .markers
                .field_for_commit(commit, effective.commit_message_incrementing)
                .unwrap_or(fallback);
            version = version.increment(field);
            count += 1;
        }

        Box::new(std::iter::once(BaseVersion {
            source: format!("Trunk based: {count} commits"),
            should_increment: false,
            semantic_version: version,
            base_version_source: None,
            branch_name_override: None,
        }))
    }
}
