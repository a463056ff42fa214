use super::{BaseVersion, Candidates, VersionStrategy, VersionStrategyKind};
use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;
use crate::repository::{Branch, Commit};
use crate::version::{SemanticVersion, TagPrefix};

/// Proposes the version named by a release branch, e.g. `release/2.1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionInBranchName;

impl VersionInBranchName {
    /// The candidate for `branch`, ignoring whether the strategy is enabled.
    pub(crate) fn candidate_for(
        ctx: &CalculationContext<'_>,
        branch: &Branch,
        effective: &EffectiveBranchConfiguration,
    ) -> Option<BaseVersion> {
        if !effective.is_release_branch {
            return None;
        }
        let (version, name_override) = version_in_name(branch.friendly_name(), ctx.tag_prefix)?;
        Some(BaseVersion {
            source: "Version in branch name".to_string(),
            should_increment: true,
            semantic_version: version,
            base_version_source: branching_point(ctx, branch, effective),
            branch_name_override: Some(name_override),
        })
    }
}

impl VersionStrategy for VersionInBranchName {
    fn kind(&self) -> VersionStrategyKind {
        VersionStrategyKind::VersionInBranchName
    }

    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        Box::new(Self::candidate_for(ctx, &ctx.current_branch, effective).into_iter())
    }
}

/// Find the first `/`- or `-`-separated part that parses as a version.
///
/// Returns the version and the branch name with that part (and the separator
/// before it) removed.
fn version_in_name(name: &str, prefix: &TagPrefix) -> Option<(SemanticVersion, String)> {
    let mut start = 0;
    let ends = name
        .char_indices()
        .filter(|(_, c)| matches!(c, '/' | '-'))
        .map(|(i, _)| i)
        .chain(std::iter::once(name.len()));
    for end in ends {
        let part = &name[start..end];
        if !part.is_empty()
            && let Some(version) = SemanticVersion::parse(part, prefix)
        {
            let name_override = if start == 0 {
                name[end..].trim_start_matches(['/', '-']).to_string()
            } else {
                format!("{}{}", &name[..start - 1], &name[end..])
            };
            return Some((version, name_override));
        }
        start = end + 1;
    }
    None
}

/// Newest merge base with a source branch that is not the branch tip itself.
fn branching_point(
    ctx: &CalculationContext<'_>,
    branch: &Branch,
    effective: &EffectiveBranchConfiguration,
) -> Option<Commit> {
    ctx.repository
        .branches()
        .into_iter()
        .filter(|other| other.name != branch.name)
        .filter(|other| {
            ctx.resolver.resolve(other).is_ok_and(|resolved| {
                resolved
                    .fragments
                    .iter()
                    .any(|f| effective.source_branches.contains(f))
            })
        })
        .filter_map(|other| ctx.repository.find_merge_base(branch, &other))
        .filter(|base| branch.tip.as_deref() != Some(base.sha.as_str()))
        .max_by(|a, b| a.when.cmp(&b.when).then_with(|| b.sha.cmp(&a.sha)))
}
