//! Version strategies.
//!
//! Each strategy proposes candidate [`BaseVersion`]s from one source of
//! truth: configuration, merge messages, tags, release branches, the branch
//! name, or the commit history itself. The calculator picks among them.
//!
//! Strategies run in the fixed order of [`registry`]; configuration only
//! switches them on and off.

mod configured_next_version;
mod merge_message;
mod tagged_commit;
mod track_release_branches;
mod trunk_based;
mod version_in_branch_name;

pub use configured_next_version::ConfiguredNextVersion;
pub use merge_message::MergeMessageStrategy;
pub use tagged_commit::TaggedCommit;
pub use track_release_branches::TrackReleaseBranches;
pub use trunk_based::TrunkBased;
pub use version_in_branch_name::VersionInBranchName;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::branch_config::EffectiveBranchConfiguration;
use crate::context::CalculationContext;
use crate::repository::Commit;
use crate::version::SemanticVersion;

/// A candidate version proposed by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseVersion {
    /// Human-readable provenance, e.g. `Git tag 'v1.2.0'`.
    pub source: String,
    /// Whether the calculator should increment this version.
    pub should_increment: bool,
    /// The candidate version.
    pub semantic_version: SemanticVersion,
    /// Commit the version is anchored to; `None` means start of history.
    pub base_version_source: Option<Commit>,
    /// Branch name to use for the label instead of the real one.
    pub branch_name_override: Option<String>,
}

/// The known strategies, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionStrategyKind {
    /// `next_version` from configuration.
    ConfiguredNextVersion,
    /// Versions found in merge commit messages.
    MergeMessage,
    /// Reachable version tags.
    TaggedCommit,
    /// Versions of release branches this branch tracks.
    TrackReleaseBranches,
    /// Version in the current (release) branch name.
    VersionInBranchName,
    /// Increment-per-commit along the mainline.
    TrunkBased,
}

impl VersionStrategyKind {
    /// Every strategy, in evaluation order.
    pub const ALL: [Self; 6] = [
        Self::ConfiguredNextVersion,
        Self::MergeMessage,
        Self::TaggedCommit,
        Self::TrackReleaseBranches,
        Self::VersionInBranchName,
        Self::TrunkBased,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for VersionStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConfiguredNextVersion => "configured-next-version",
            Self::MergeMessage => "merge-message",
            Self::TaggedCommit => "tagged-commit",
            Self::TrackReleaseBranches => "track-release-branches",
            Self::VersionInBranchName => "version-in-branch-name",
            Self::TrunkBased => "trunk-based",
        };
        f.write_str(name)
    }
}

/// The set of enabled strategies.
///
/// Serialized as a list of kebab-case names; list order is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<VersionStrategyKind>", into = "Vec<VersionStrategyKind>")]
pub struct VersionStrategies(u8);

impl VersionStrategies {
    /// No strategies.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every strategy.
    pub fn all() -> Self {
        VersionStrategyKind::ALL.into_iter().collect()
    }

    /// Whether `kind` is enabled.
    pub const fn contains(self, kind: VersionStrategyKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Enable `kind`.
    pub const fn insert(&mut self, kind: VersionStrategyKind) {
        self.0 |= kind.bit();
    }

    /// Disable `kind`.
    pub const fn remove(&mut self, kind: VersionStrategyKind) {
        self.0 &= !kind.bit();
    }

    /// Enabled strategies in evaluation order.
    pub fn iter(self) -> impl Iterator<Item = VersionStrategyKind> {
        VersionStrategyKind::ALL
            .into_iter()
            .filter(move |k| self.contains(*k))
    }
}

impl Default for VersionStrategies {
    fn default() -> Self {
        let mut set = Self::all();
        set.remove(VersionStrategyKind::TrunkBased);
        set
    }
}

impl FromIterator<VersionStrategyKind> for VersionStrategies {
    fn from_iter<I: IntoIterator<Item = VersionStrategyKind>>(iter: I) -> Self {
        let mut set = Self::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<Vec<VersionStrategyKind>> for VersionStrategies {
    fn from(kinds: Vec<VersionStrategyKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<VersionStrategies> for Vec<VersionStrategyKind> {
    fn from(set: VersionStrategies) -> Self {
        set.iter().collect()
    }
}

/// Boxed candidate sequence returned by strategies.
pub type Candidates<'a> = Box<dyn Iterator<Item = BaseVersion> + 'a>;

/// A source of candidate base versions.
///
/// Implementations are stateless. Every call to [`Self::candidates`] builds
/// a fresh, finite iterator and has no side effects.
pub trait VersionStrategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> VersionStrategyKind;

    /// Candidates regardless of whether the strategy is enabled.
    fn candidates<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a>;

    /// Candidates, or nothing when the strategy is disabled in configuration.
    fn base_versions<'a>(
        &'a self,
        ctx: &'a CalculationContext<'a>,
        effective: &'a EffectiveBranchConfiguration,
    ) -> Candidates<'a> {
        if ctx.config.version_strategies.contains(self.kind()) {
            self.candidates(ctx, effective)
        } else {
            Box::new(std::iter::empty())
        }
    }
}

static REGISTRY: [&dyn VersionStrategy; 6] = [
    &ConfiguredNextVersion,
    &MergeMessageStrategy,
    &TaggedCommit,
    &TrackReleaseBranches,
    &VersionInBranchName,
    &TrunkBased,
];

/// Every strategy, in evaluation order.
pub fn registry() -> &'static [&'static dyn VersionStrategy] {
    &REGISTRY
}
