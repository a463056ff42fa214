use super::{BaseVersion, Candidates, VersionStrategy, VersionStrategyKind};
use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;
use crate::version::SemanticVersion;

/// Proposes `next_version` from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredNextVersion;

impl VersionStrategy for ConfiguredNextVersion {
    fn kind(&self) -> VersionStrategyKind {
        VersionStrategyKind::ConfiguredNextVersion
    }

    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        _effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        let candidate = ctx
            .config
            .next_version
            .as_deref()
            .and_then(|text| SemanticVersion::parse(text, ctx.tag_prefix))
            .map(|version| BaseVersion {
                source: "NextVersion in configuration file".to_string(),
                should_increment: false,
                semantic_version: version,
                base_version_source: None,
                branch_name_override: None,
            });
        Box::new(candidate.into_iter())
    }
}
