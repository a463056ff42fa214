//! Deployment modes and the build metadata they finalize.
//!
//! The calculator's version is finished in two steps: [`BuildMetadataBuilder`]
//! measures the distance from the version source, then [`finalize`] applies
//! the branch's [`DeploymentMode`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::CalculationContext;
use crate::repository::Commit;
use crate::version::{BuildMetaData, SemanticVersion};

/// How versions on a branch are published.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Every build is a potential release; pre-release tags are dropped.
    ContinuousDeployment,
    /// Pre-release numbers count commits since the version source.
    #[default]
    ContinuousDelivery,
    /// Versions are left as calculated.
    ManualDeployment,
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinuousDeployment => write!(f, "continuous-deployment"),
            Self::ContinuousDelivery => write!(f, "continuous-delivery"),
            Self::ManualDeployment => write!(f, "manual-deployment"),
        }
    }
}

/// Builds [`BuildMetaData`] for the current commit.
pub struct BuildMetadataBuilder<'c, 'a> {
    ctx: &'c CalculationContext<'a>,
    uncommitted: u64,
}

impl<'c, 'a> BuildMetadataBuilder<'c, 'a> {
    /// Create a builder reading from `ctx`.
    pub fn new(ctx: &'c CalculationContext<'a>) -> Self {
        Self {
            ctx,
            uncommitted: ctx.repository.uncommitted_change_count(),
        }
    }

    /// Measure the current commit against `base_version_source`.
    pub fn build(&self, base_version_source: Option<&Commit>) -> BuildMetaData {
        let commits = self.ctx.commits_since(base_version_source);
        let current = &self.ctx.current_commit;
        BuildMetaData {
            commits_since_tag: Some(commits),
            commits_since_version_source: commits,
            version_source_sha: base_version_source.map(|c| c.sha.clone()),
            branch: Some(self.ctx.current_branch.friendly_name().to_string()),
            commit_sha: Some(current.sha.clone()),
            commit_short_sha: Some(current.short_sha().to_string()),
            commit_date: Some(current.when),
            uncommitted_changes: self.uncommitted,
            other_metadata: None,
        }
    }
}

/// Attach `metadata` to `version` according to `mode`.
pub fn finalize(mode: DeploymentMode, version: SemanticVersion, metadata: BuildMetaData) -> SemanticVersion {
    match mode {
        DeploymentMode::ContinuousDeployment => continuous_deployment(version, metadata),
        DeploymentMode::ContinuousDelivery => continuous_delivery(version, metadata),
        DeploymentMode::ManualDeployment => manual_deployment(version, metadata),
    }
}

/// Drop the pre-release tag; the commit count moves to the version source
/// count.
pub fn continuous_deployment(version: SemanticVersion, mut metadata: BuildMetaData) -> SemanticVersion {
    if let Some(commits) = metadata.commits_since_tag.take() {
        metadata.commits_since_version_source = commits;
    }
    version
        .with_pre_release(None)
        .with_build_metadata(Some(metadata))
}

/// Turn the pre-release number into a running count of commits.
pub fn continuous_delivery(mut version: SemanticVersion, metadata: BuildMetaData) -> SemanticVersion {
    if let Some(commits) = metadata.commits_since_tag
        && commits > 0
        && let Some(ref mut tag) = version.pre_release_tag
    {
        // commits > 0, so the sum is at least 1
        tag.number = Some(tag.number.unwrap_or(1).saturating_add(commits) - 1);
    }
    version.with_build_metadata(Some(metadata))
}

/// Attach metadata and leave the version alone.
pub fn manual_deployment(version: SemanticVersion, metadata: BuildMetaData) -> SemanticVersion {
    version.with_build_metadata(Some(metadata))
}
