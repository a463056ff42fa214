//! Increment decision from commit messages.
//!
//! Commits after the version source are scanned for `+semver:` style
//! markers; the most severe marker wins. Without a marker the branch's
//! default increment applies.

use regex::Regex;

use crate::branch_config::EffectiveBranchConfiguration;
use crate::config::{CommitMessageIncrementMode, Config};
use crate::context::CalculationContext;
use crate::error::{ConfigResult, compile_pattern};
use crate::repository::Commit;
use crate::version::VersionField;

/// Compiled increment marker patterns.
#[derive(Debug, Clone)]
pub struct IncrementMarkers {
    major: Regex,
    minor: Regex,
    patch: Regex,
    none: Regex,
}

impl IncrementMarkers {
    /// Compile the four marker patterns from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidPattern`] for a pattern that does
    /// not compile.
    pub fn new(config: &Config) -> ConfigResult<Self> {
        Ok(Self {
            major: compile_pattern("major_version_bump_message", &config.major_version_bump_message)?,
            minor: compile_pattern("minor_version_bump_message", &config.minor_version_bump_message)?,
            patch: compile_pattern("patch_version_bump_message", &config.patch_version_bump_message)?,
            none: compile_pattern("no_bump_message", &config.no_bump_message)?,
        })
    }

    /// The most severe marker in `message`, if any.
    pub fn field_for(&self, message: &str) -> Option<VersionField> {
        if self.major.is_match(message) {
            Some(VersionField::Major)
        } else if self.minor.is_match(message) {
            Some(VersionField::Minor)
        } else if self.patch.is_match(message) {
            Some(VersionField::Patch)
        } else if self.none.is_match(message) {
            Some(VersionField::None)
        } else {
            None
        }
    }

    /// Marker for `commit` under the given scanning mode.
    pub fn field_for_commit(
        &self,
        commit: &Commit,
        mode: CommitMessageIncrementMode,
    ) -> Option<VersionField> {
        match mode {
            CommitMessageIncrementMode::Disabled => None,
            CommitMessageIncrementMode::MergeMessageOnly if !commit.is_merge() => None,
            _ => self.field_for(&commit.message),
        }
    }
}

/// Decide the increment for a version anchored at `base_version_source`.
pub fn find_increment(
    ctx: &CalculationContext<'_>,
    base_version_source: Option<&Commit>,
    effective: &EffectiveBranchConfiguration,
) -> VersionField {
    let mode = effective.commit_message_incrementing;
    if mode == CommitMessageIncrementMode::Disabled {
        return effective.increment;
    }

    let found = ctx
        .commit_log(base_version_source)
        .iter()
        .filter_map(|c| ctx.markers.field_for_commit(c, mode))
        .max();

    let field = found.unwrap_or(effective.increment);
    tracing::debug!(
        marker = ?found,
        default = %effective.increment,
        %field,
        "increment decided"
    );
    field
}
