//! Selection of the winning base version and the next version.

use std::cmp::Ordering;

use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;
use crate::increment::find_increment;
use crate::strategies::{BaseVersion, VersionStrategy, registry};
use crate::version::{PreReleaseTag, SemanticVersion, VersionField};

/// The calculator's result, before deployment finalization.
#[derive(Debug, Clone)]
pub struct NextVersion {
    /// The incremented and labelled version, without build metadata.
    pub version: SemanticVersion,
    /// The candidate that won.
    pub base_version: BaseVersion,
    /// The increment that was applied.
    pub increment: VersionField,
    /// Configuration of the branch the version was calculated for.
    pub configuration: EffectiveBranchConfiguration,
}

/// Runs the strategies and derives the next version.
#[derive(Clone, Copy)]
pub struct NextVersionCalculator {
    strategies: &'static [&'static dyn VersionStrategy],
}

impl Default for NextVersionCalculator {
    fn default() -> Self {
        Self::new(registry())
    }
}

impl std::fmt::Debug for NextVersionCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.kind()))
            .finish()
    }
}

impl NextVersionCalculator {
    /// Create a calculator over `strategies`, evaluated in slice order.
    pub const fn new(strategies: &'static [&'static dyn VersionStrategy]) -> Self {
        Self { strategies }
    }

    /// Calculate the next version for the context's current commit.
    #[tracing::instrument(skip_all, fields(branch = %ctx.current_branch.name))]
    pub fn calculate(
        &self,
        ctx: &CalculationContext<'_>,
        effective: &EffectiveBranchConfiguration,
    ) -> NextVersion {
        let mut candidates: Vec<BaseVersion> = Vec::new();
        for strategy in self.strategies {
            let before = candidates.len();
            candidates.extend(strategy.base_versions(ctx, effective));
            tracing::debug!(
                strategy = %strategy.kind(),
                found = candidates.len() - before,
                "strategy evaluated"
            );
        }

        let base = select(candidates).unwrap_or_else(fallback);
        tracing::debug!(
            source = %base.source,
            version = %base.semantic_version,
            should_increment = base.should_increment,
            "base version selected"
        );

        let increment = if base.should_increment {
            find_increment(ctx, base.base_version_source.as_ref(), effective)
        } else {
            VersionField::None
        };

        let incremented = base
            .semantic_version
            .increment(increment)
            .with_build_metadata(None);

        let exact = !base.should_increment
            && base
                .base_version_source
                .as_ref()
                .is_some_and(|c| c.sha == ctx.current_commit.sha);
        let version = if exact {
            incremented
        } else {
            apply_label(incremented, effective.label(base.branch_name_override.as_deref()))
        };

        NextVersion {
            version,
            base_version: base,
            increment,
            configuration: effective.clone(),
        }
    }
}

fn fallback() -> BaseVersion {
    BaseVersion {
        source: "Fallback base version".to_string(),
        should_increment: true,
        semantic_version: SemanticVersion::new(0, 0, 0),
        base_version_source: None,
        branch_name_override: None,
    }
}

/// Highest version wins; among equal versions the older anchor wins, with
/// "no anchor" oldest of all, then the earliest yielded.
fn select(candidates: Vec<BaseVersion>) -> Option<BaseVersion> {
    candidates.into_iter().reduce(|best, next| {
        match next.semantic_version.cmp(&best.semantic_version) {
            Ordering::Greater => next,
            Ordering::Equal if anchor_is_older(&next, &best) => next,
            _ => best,
        }
    })
}

fn anchor_is_older(a: &BaseVersion, b: &BaseVersion) -> bool {
    match (&a.base_version_source, &b.base_version_source) {
        (None, Some(_)) => true,
        (Some(a), Some(b)) => a.when < b.when,
        _ => false,
    }
}

fn apply_label(version: SemanticVersion, label: Option<String>) -> SemanticVersion {
    let Some(label) = label else {
        return version;
    };
    if label.is_empty() {
        return version.with_pre_release(None);
    }
    match version.pre_release_tag {
        Some(ref tag) if tag.same_label(&label) => version,
        _ => version.with_pre_release(Some(PreReleaseTag::new(label, Some(1)))),
    }
}
