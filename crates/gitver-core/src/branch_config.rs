//! Effective branch configuration.
//!
//! A branch's configuration is assembled from the global defaults on
//! [`Config`] and every branch fragment whose regex matches the branch name,
//! merged in `(priority, name)` order. The `unknown` fragment is applied only
//! when no other fragment matches.

use std::collections::{BTreeMap, VecDeque};

use regex::Regex;
use serde::Serialize;

use crate::config::{
    BranchConfig, CommitMessageIncrementMode, Config, IncrementStrategy, UNKNOWN_BRANCH,
};
use crate::deployment::DeploymentMode;
use crate::error::{ConfigError, ConfigResult, compile_pattern};
use crate::repository::Branch;
use crate::version::{VersionField, escape_branch_name};

/// The fully merged configuration for one branch.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveBranchConfiguration {
    /// The branch this configuration was resolved for.
    pub branch: Branch,
    /// Names of the fragments that were merged, in merge order.
    pub fragments: Vec<String>,
    /// Increment applied when no marker forces one.
    pub increment: VersionField,
    /// Regex of the last matching fragment that set one.
    pub regex: Option<String>,
    /// Whether the branch name carries the version being released.
    pub is_release_branch: bool,
    /// Whether the branch is a mainline.
    pub is_main_branch: bool,
    /// Whether release branches are a version source.
    pub tracks_release_branches: bool,
    /// Fragment names this branch is usually created from.
    pub source_branches: Vec<String>,
    /// Pre-release label template. `None` leaves existing tags alone.
    pub label: Option<String>,
    /// Deployment mode.
    pub mode: DeploymentMode,
    /// Which commits are scanned for increment markers.
    pub commit_message_incrementing: CommitMessageIncrementMode,
    /// Whether versions read from merge messages are used as-is.
    pub prevent_increment_of_merged_branch_version: bool,
    #[serde(skip)]
    compiled_regex: Option<Regex>,
}

impl EffectiveBranchConfiguration {
    /// Render the label template for this branch.
    ///
    /// Named groups of the branch regex are substituted as `{GroupName}`,
    /// matched against `name_override` when given. Whatever is left of
    /// `{BranchName}` becomes the whole (overridden) branch name. The result
    /// has every non-alphanumeric character replaced with `-`.
    pub fn label(&self, name_override: Option<&str>) -> Option<String> {
        let template = self.label.as_deref()?;
        if template.is_empty() {
            return Some(String::new());
        }

        let name = name_override.unwrap_or_else(|| self.branch.friendly_name());
        let mut label = template.to_string();
        if let Some(ref regex) = self.compiled_regex
            && let Some(caps) = regex.captures(name)
        {
            for group in regex.capture_names().flatten() {
                let value = caps.name(group).map_or("", |m| m.as_str());
                label = label.replace(&format!("{{{group}}}"), value);
            }
        }
        label = label.replace("{BranchName}", name);
        Some(escape_branch_name(&label))
    }
}

#[derive(Debug, Clone)]
struct Fragment {
    name: String,
    regex: Option<Regex>,
    config: BranchConfig,
}

/// Resolves [`EffectiveBranchConfiguration`] for branches.
#[derive(Debug, Clone)]
pub struct BranchConfigurationResolver {
    global: BranchConfig,
    global_increment: IncrementStrategy,
    fragments: Vec<Fragment>,
    unknown: Option<BranchConfig>,
    by_name: BTreeMap<String, BranchConfig>,
}

impl BranchConfigurationResolver {
    /// Compile every branch regex in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for a regex that does not
    /// compile.
    pub fn new(config: &Config) -> ConfigResult<Self> {
        let mut fragments = Vec::new();
        for (name, branch) in &config.branches {
            if name == UNKNOWN_BRANCH {
                continue;
            }
            let regex = branch
                .regex
                .as_deref()
                .map(|pattern| compile_pattern(&format!("branches.{name}.regex"), pattern))
                .transpose()?;
            fragments.push(Fragment {
                name: name.clone(),
                regex,
                config: branch.clone(),
            });
        }
        fragments.sort_by(|a, b| {
            let key = |f: &Fragment| f.config.priority.unwrap_or(i64::MAX);
            key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
        });

        let global = BranchConfig {
            increment: Some(config.increment),
            mode: Some(config.mode),
            label: config.label.clone(),
            commit_message_incrementing: Some(config.commit_message_incrementing),
            ..BranchConfig::default()
        };

        Ok(Self {
            global,
            global_increment: config.increment,
            fragments,
            unknown: config.branches.get(UNKNOWN_BRANCH).cloned(),
            by_name: config.branches.clone(),
        })
    }

    /// Whether any fragment marks its branches as release branches.
    pub fn release_branches_configured(&self) -> bool {
        self.by_name
            .values()
            .any(|b| b.is_release_branch == Some(true))
    }

    /// Resolve the effective configuration for `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoBranchConfiguration`] when nothing matches
    /// and no `unknown` fragment exists.
    pub fn resolve(&self, branch: &Branch) -> ConfigResult<EffectiveBranchConfiguration> {
        let name = branch.friendly_name();
        let mut merged = self.global.clone();
        let mut applied = Vec::new();
        let mut compiled_regex = None;

        for fragment in &self.fragments {
            let Some(ref regex) = fragment.regex else {
                continue;
            };
            if regex.is_match(name) {
                merged.merge_from(&fragment.config);
                compiled_regex = Some(regex.clone());
                applied.push(fragment.name.clone());
            }
        }

        if applied.is_empty() {
            let unknown = self
                .unknown
                .as_ref()
                .ok_or_else(|| ConfigError::NoBranchConfiguration {
                    branch: name.to_string(),
                })?;
            merged.merge_from(unknown);
            applied.push(UNKNOWN_BRANCH.to_string());
        }

        let increment = self.resolve_increment(merged.increment, merged.source_branches.as_deref());
        tracing::debug!(branch = name, fragments = ?applied, %increment, "branch configuration resolved");

        Ok(EffectiveBranchConfiguration {
            branch: branch.clone(),
            fragments: applied,
            increment,
            regex: compiled_regex.as_ref().map(|r| r.as_str().to_string()),
            is_release_branch: merged.is_release_branch.unwrap_or(false),
            is_main_branch: merged.is_main_branch.unwrap_or(false),
            tracks_release_branches: merged.tracks_release_branches.unwrap_or(false),
            source_branches: merged.source_branches.unwrap_or_default(),
            label: merged.label,
            mode: merged.mode.unwrap_or_default(),
            commit_message_incrementing: merged.commit_message_incrementing.unwrap_or_default(),
            prevent_increment_of_merged_branch_version: merged
                .prevent_increment_of_merged_branch_version
                .unwrap_or(false),
            compiled_regex,
        })
    }

    /// Follow `source_branches` breadth-first until a concrete increment is
    /// found, visiting each fragment at most once.
    fn resolve_increment(
        &self,
        increment: Option<IncrementStrategy>,
        sources: Option<&[String]>,
    ) -> VersionField {
        if let Some(field) = increment.and_then(IncrementStrategy::version_field) {
            return field;
        }

        let mut queue: VecDeque<&str> = sources.unwrap_or_default().iter().map(String::as_str).collect();
        let mut visited = Vec::new();
        while let Some(name) = queue.pop_front() {
            if visited.contains(&name) || visited.len() >= self.by_name.len() {
                continue;
            }
            visited.push(name);
            let Some(fragment) = self.by_name.get(name) else {
                continue;
            };
            if let Some(field) = fragment.increment.and_then(IncrementStrategy::version_field) {
                return field;
            }
            if let Some(ref next) = fragment.source_branches {
                queue.extend(next.iter().map(String::as_str));
            }
        }

        self.global_increment
            .version_field()
            .unwrap_or(VersionField::Patch)
    }
}
