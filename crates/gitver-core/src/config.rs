//! Configuration loading and discovery.
//!
//! [`Config`] is the configuration snapshot the engine consumes. It is
//! assembled by [`ConfigLoader`] from, in order of precedence (highest first):
//!
//! - explicit files passed with [`ConfigLoader::with_file`]
//! - `GITVER_*` environment variables
//! - `.gitver.<ext>` in the current directory or any parent
//! - `gitver.<ext>` in the current directory or any parent
//! - `~/.config/gitver/config.<ext>` (user config)
//! - built-in defaults, including the GitFlow-style branch set
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! Branch fragments are keyed by name, so a project file only needs to state
//! the fields it changes:
//!
//! ```yaml
//! tag_prefix: "[vV]?"
//! branches:
//!   feature:
//!     label: "{BranchName}"
//!     increment: minor
//! merge_message_formats:
//!   - name: tfs
//!     pattern: '^Merged PR (?P<PullRequestNumber>\d+): Merge (?P<SourceBranch>.+) to (?P<TargetBranch>.+)'
//! ```
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use gitver_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```

use std::collections::{BTreeMap, BTreeSet};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::deployment::DeploymentMode;
use crate::error::{ConfigError, ConfigResult};
use crate::repository::Commit;
use crate::strategies::VersionStrategies;
use crate::version::{TagPrefix, VersionField};

/// Name of the fallback branch fragment applied when nothing else matches.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// The configuration for gitver.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for daily JSON-lines log files (logs go to stderr if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Regex matched (case-insensitively) at the start of tag names.
    pub tag_prefix: Option<String>,
    /// Version to use as a floor, e.g. `2.0.0` while preparing a major.
    pub next_version: Option<String>,
    /// Default deployment mode for branches that do not set one.
    pub mode: DeploymentMode,
    /// Default increment for branches that do not set one.
    pub increment: IncrementStrategy,
    /// Default pre-release label template.
    pub label: Option<String>,
    /// Whether commit messages may force an increment.
    pub commit_message_incrementing: CommitMessageIncrementMode,
    /// Marker that forces a major increment.
    pub major_version_bump_message: String,
    /// Marker that forces a minor increment.
    pub minor_version_bump_message: String,
    /// Marker that forces a patch increment.
    pub patch_version_bump_message: String,
    /// Marker that suppresses incrementing.
    pub no_bump_message: String,
    /// `strftime` format for the `CommitDate` variable.
    pub commit_date_format: String,
    /// Custom merge message formats, tried in order before the built-ins.
    pub merge_message_formats: Vec<MergeMessageFormat>,
    /// Enabled version strategies.
    pub version_strategies: VersionStrategies,
    /// Commits excluded from counting and scanning.
    pub ignore: IgnoreConfig,
    /// Branch configuration fragments keyed by name.
    pub branches: BTreeMap<String, BranchConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            tag_prefix: Some("[vV]?".to_string()),
            next_version: None,
            mode: DeploymentMode::ContinuousDelivery,
            increment: IncrementStrategy::Patch,
            label: Some("{BranchName}".to_string()),
            commit_message_incrementing: CommitMessageIncrementMode::Enabled,
            major_version_bump_message: r"\+semver:\s?(breaking|major)|BREAKING[ -]CHANGE:".to_string(),
            minor_version_bump_message: r"\+semver:\s?(feature|minor)".to_string(),
            patch_version_bump_message: r"\+semver:\s?(fix|patch)".to_string(),
            no_bump_message: r"\+semver:\s?(none|skip)".to_string(),
            commit_date_format: "%Y-%m-%d".to_string(),
            merge_message_formats: Vec::new(),
            version_strategies: VersionStrategies::default(),
            ignore: IgnoreConfig::default(),
            branches: default_branches(),
        }
    }
}

impl Config {
    /// Compile the configured tag prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for an invalid regex.
    pub fn tag_prefix(&self) -> ConfigResult<TagPrefix> {
        TagPrefix::new(self.tag_prefix.as_deref())
    }
}

/// A named custom merge message pattern.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MergeMessageFormat {
    /// Name reported as the classification's format name.
    pub name: String,
    /// Regex with optional `SourceBranch`, `TargetBranch` and
    /// `PullRequestNumber` named groups.
    pub pattern: String,
}

/// Commits to leave out of counting and scanning.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Commits at or before this instant are ignored.
    pub before: Option<DateTime<FixedOffset>>,
    /// Commits whose sha starts with one of these are ignored.
    pub shas: BTreeSet<String>,
}

impl IgnoreConfig {
    /// Whether `commit` falls under this policy.
    pub fn is_ignored(&self, commit: &Commit) -> bool {
        self.before.is_some_and(|before| commit.when <= before)
            || self
                .shas
                .iter()
                .any(|sha| !sha.is_empty() && commit.sha.starts_with(sha.as_str()))
    }
}

/// How a branch increments when its version is not forced otherwise.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IncrementStrategy {
    /// Use the increment of the branch this one was created from.
    #[default]
    Inherit,
    /// Do not increment.
    None,
    /// Increment the patch component.
    Patch,
    /// Increment the minor component.
    Minor,
    /// Increment the major component.
    Major,
}

impl IncrementStrategy {
    /// The concrete field, or `None` for [`IncrementStrategy::Inherit`].
    pub const fn version_field(self) -> Option<VersionField> {
        match self {
            Self::Inherit => None,
            Self::None => Some(VersionField::None),
            Self::Patch => Some(VersionField::Patch),
            Self::Minor => Some(VersionField::Minor),
            Self::Major => Some(VersionField::Major),
        }
    }
}

/// Which commits are scanned for increment markers.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMessageIncrementMode {
    /// Scan every commit.
    #[default]
    Enabled,
    /// Never scan.
    Disabled,
    /// Scan merge commits only.
    MergeMessageOnly,
}

/// A branch configuration fragment.
///
/// Every field is optional: unset fields inherit from earlier fragments and
/// finally from the global defaults on [`Config`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BranchConfig {
    /// Regex matched against the branch name. Named groups are available to
    /// the label template as `{GroupName}`.
    pub regex: Option<String>,
    /// Merge order; lower values merge first. Unset sorts last.
    pub priority: Option<i64>,
    /// Increment applied when no marker forces one.
    pub increment: Option<IncrementStrategy>,
    /// Deployment mode.
    pub mode: Option<DeploymentMode>,
    /// Pre-release label template; empty means a release version.
    pub label: Option<String>,
    /// Whether the branch name carries the version being released.
    pub is_release_branch: Option<bool>,
    /// Whether the branch is a mainline.
    pub is_main_branch: Option<bool>,
    /// Whether release branches count as a version source for this branch.
    pub tracks_release_branches: Option<bool>,
    /// Whether versions read from merge messages are used as-is.
    pub prevent_increment_of_merged_branch_version: Option<bool>,
    /// Which commits are scanned for increment markers.
    pub commit_message_incrementing: Option<CommitMessageIncrementMode>,
    /// Names of the fragments this branch is usually created from.
    pub source_branches: Option<Vec<String>>,
}

impl BranchConfig {
    /// Overlay the fields `other` sets explicitly.
    pub fn merge_from(&mut self, other: &Self) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.regex, &other.regex);
        take(&mut self.priority, &other.priority);
        take(&mut self.increment, &other.increment);
        take(&mut self.mode, &other.mode);
        take(&mut self.label, &other.label);
        take(&mut self.is_release_branch, &other.is_release_branch);
        take(&mut self.is_main_branch, &other.is_main_branch);
        take(&mut self.tracks_release_branches, &other.tracks_release_branches);
        take(
            &mut self.prevent_increment_of_merged_branch_version,
            &other.prevent_increment_of_merged_branch_version,
        );
        take(
            &mut self.commit_message_incrementing,
            &other.commit_message_incrementing,
        );
        take(&mut self.source_branches, &other.source_branches);
    }
}

fn names(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| (*s).to_string()).collect())
}

/// Built-in GitFlow-style branch fragments.
pub fn default_branches() -> BTreeMap<String, BranchConfig> {
    let mut branches = BTreeMap::new();
    branches.insert(
        "main".to_string(),
        BranchConfig {
            regex: Some("^master$|^main$".into()),
            priority: Some(10),
            increment: Some(IncrementStrategy::Patch),
            label: Some(String::new()),
            is_main_branch: Some(true),
            is_release_branch: Some(false),
            tracks_release_branches: Some(false),
            prevent_increment_of_merged_branch_version: Some(true),
            source_branches: names(&[]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        "develop".to_string(),
        BranchConfig {
            regex: Some("^dev(elop)?(ment)?$".into()),
            priority: Some(20),
            increment: Some(IncrementStrategy::Minor),
            label: Some("alpha".into()),
            tracks_release_branches: Some(true),
            source_branches: names(&["main"]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        "release".to_string(),
        BranchConfig {
            regex: Some("^releases?[/-](?<BranchName>.+)".into()),
            priority: Some(30),
            increment: Some(IncrementStrategy::None),
            mode: Some(DeploymentMode::ManualDeployment),
            label: Some("beta".into()),
            is_release_branch: Some(true),
            prevent_increment_of_merged_branch_version: Some(true),
            source_branches: names(&["main", "develop", "support", "release"]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        "feature".to_string(),
        BranchConfig {
            regex: Some("^features?[/-](?<BranchName>.+)".into()),
            priority: Some(40),
            increment: Some(IncrementStrategy::Inherit),
            mode: Some(DeploymentMode::ManualDeployment),
            label: Some("{BranchName}".into()),
            source_branches: names(&["develop", "main", "release", "support", "hotfix"]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        "pull-request".to_string(),
        BranchConfig {
            regex: Some(r"^(pull-requests|pull|pr)[/-](?<Number>\d*)".into()),
            priority: Some(50),
            increment: Some(IncrementStrategy::Inherit),
            label: Some("PullRequest{Number}".into()),
            source_branches: names(&["develop", "main", "release", "feature", "support", "hotfix"]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        "hotfix".to_string(),
        BranchConfig {
            regex: Some("^hotfix(es)?[/-](?<BranchName>.+)".into()),
            priority: Some(60),
            increment: Some(IncrementStrategy::Inherit),
            mode: Some(DeploymentMode::ManualDeployment),
            label: Some("beta".into()),
            is_release_branch: Some(true),
            source_branches: names(&["main", "support"]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        "support".to_string(),
        BranchConfig {
            regex: Some("^support[/-](?<BranchName>.+)".into()),
            priority: Some(70),
            increment: Some(IncrementStrategy::Patch),
            label: Some(String::new()),
            is_main_branch: Some(true),
            prevent_increment_of_merged_branch_version: Some(true),
            source_branches: names(&["main"]),
            ..BranchConfig::default()
        },
    );
    branches.insert(
        UNKNOWN_BRANCH.to_string(),
        BranchConfig {
            increment: Some(IncrementStrategy::Inherit),
            mode: Some(DeploymentMode::ManualDeployment),
            label: Some("{BranchName}".into()),
            source_branches: names(&[
                "main",
                "develop",
                "release",
                "feature",
                "pull-request",
                "hotfix",
                "support",
            ]),
            ..BranchConfig::default()
        },
    );
    branches
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "gitver";

/// Prefix for environment variable overrides (`GITVER_NEXT_VERSION`, ...).
const ENV_PREFIX: &str = "GITVER_";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Whether `GITVER_*` environment variables override file values.
    include_env: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            include_env: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/gitver/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set whether `GITVER_*` environment variables are applied.
    pub const fn with_env(mut self, include: bool) -> Self {
        self.include_env = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after every other source.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Files [`ConfigLoader::load`] would merge, lowest precedence first.
    ///
    /// Environment variables and built-in defaults are not files and are
    /// not listed.
    pub fn sources(&self) -> Vec<Utf8PathBuf> {
        let mut sources = Vec::new();
        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            sources.push(user_config);
        }
        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            sources.push(project_config);
        }
        sources.extend(self.explicit_files.iter().cloned());
        sources
    }

    /// Load configuration, merging all discovered sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            tracing::debug!(path = %project_config, "project config found");
            figment = Self::merge_file(figment, &project_config);
        }

        if self.include_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).only(&[
                "log_level",
                "log_dir",
                "tag_prefix",
                "next_version",
                "mode",
                "increment",
                "label",
            ]));
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            branches = config.branches.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Load configuration, returning an error if no config file is found.
    pub fn load_or_error(self) -> ConfigResult<Config> {
        let has_user = self.include_user_config && self.find_user_config().is_some();
        let has_project = self
            .project_search_root
            .as_ref()
            .and_then(|root| self.find_project_config(root))
            .is_some();
        let has_explicit = !self.explicit_files.is_empty();

        if !has_user && !has_project && !has_explicit {
            return Err(ConfigError::NotFound);
        }

        self.load()
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // A repository root ends the walk after its own directory is checked.
            if self.boundary_marker.as_ref().is_some_and(|m| dir.join(m).exists()) {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
///
/// Useful for commands that need to know where config is located.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/gitver/` on Linux, `~/Library/Application Support/gitver/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path. Version cache files live here.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::VersionStrategyKind;
    use std::fs;
    use tempfile::TempDir;

    fn loader() -> ConfigLoader {
        ConfigLoader::new().with_user_config(false).with_env(false)
    }

    fn write(dir: &TempDir, name: &str, body: &str) -> Utf8PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        Utf8PathBuf::try_from(path).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.tag_prefix.as_deref(), Some("[vV]?"));
        assert!(config.branches.contains_key("main"));
        assert!(config.branches.contains_key(UNKNOWN_BRANCH));
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let config = loader().without_boundary_marker().load().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_single_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.toml",
            r#"log_level = "debug"
log_dir = "/tmp/gitver"
next_version = "3.0.0"
"#,
        );

        let config = loader().with_file(&path).load().unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.log_dir.as_ref().map(|d| d.as_str()), Some("/tmp/gitver"));
        assert_eq!(config.next_version.as_deref(), Some("3.0.0"));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = write(&tmp, "base.toml", r#"log_level = "warn""#);
        let over = write(&tmp, "override.toml", r#"log_level = "error""#);

        let config = loader().with_file(&base).with_file(&over).load().unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_branch_fragment_deep_merges_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "gitver.yaml",
            r"
branches:
  feature:
    increment: minor
  experiment:
    regex: '^exp/'
    label: exp
",
        );

        let config = loader().with_file(&path).load().unwrap();

        let feature = &config.branches["feature"];
        assert_eq!(feature.increment, Some(IncrementStrategy::Minor));
        assert_eq!(feature.label.as_deref(), Some("{BranchName}"));
        assert_eq!(feature.regex.as_deref(), Some("^features?[/-](?<BranchName>.+)"));
        assert_eq!(config.branches["experiment"].label.as_deref(), Some("exp"));
        assert!(config.branches.contains_key("main"));
    }

    #[test]
    fn test_merge_message_formats_keep_order() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "gitver.yaml",
            r"
merge_message_formats:
  - name: zeta
    pattern: '^zeta'
  - name: alpha
    pattern: '^alpha'
",
        );

        let config = loader().with_file(&path).load().unwrap();
        let names: Vec<_> = config
            .merge_message_formats
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn test_version_strategies_from_list() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "gitver.json",
            r#"{ "version_strategies": ["tagged-commit", "trunk-based"] }"#,
        );

        let config = loader().with_file(&path).load().unwrap();
        assert!(config.version_strategies.contains(VersionStrategyKind::TaggedCommit));
        assert!(config.version_strategies.contains(VersionStrategyKind::TrunkBased));
        assert!(!config.version_strategies.contains(VersionStrategyKind::MergeMessage));
    }

    #[test]
    fn test_ignore_section() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "gitver.yaml",
            r"
ignore:
  before: 2024-01-01T00:00:00+00:00
  shas: [abc1234]
",
        );

        let config = loader().with_file(&path).load().unwrap();
        assert!(config.ignore.before.is_some());
        assert!(config.ignore.shas.contains("abc1234"));
    }

    #[test]
    fn test_invalid_value_is_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "gitver.toml", r#"mode = "sometimes""#);

        let result = loader().with_file(&path).load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("src").join("deep");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(project_dir.join(".gitver.toml"), r#"log_level = "debug""#).unwrap();

        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();
        let config = loader()
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".gitver.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();
        let config = loader()
            .with_boundary_marker(".git")
            .with_project_search(&work)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_config_at_repository_root_is_found() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("repo");
        let work = root.join("src");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join("gitver.yml"), "log_level: error\n").unwrap();

        let work = Utf8PathBuf::try_from(work).unwrap();
        let config = loader().with_project_search(&work).load().unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, ".gitver.toml", r#"log_level = "warn""#);
        let over = write(&tmp, "override.toml", r#"log_level = "error""#);

        let tmp_path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let config = loader()
            .without_boundary_marker()
            .with_project_search(&tmp_path)
            .with_file(&over)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
    }

    #[test]
    fn test_sources_list_files_in_merge_order() {
        let tmp = TempDir::new().unwrap();
        let project = write(&tmp, ".gitver.yaml", "log_level: warn\n");
        let over = write(&tmp, "override.json", r#"{"log_level": "error"}"#);

        let tmp_path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let sources = loader()
            .without_boundary_marker()
            .with_project_search(&tmp_path)
            .with_file(&over)
            .sources();

        assert_eq!(sources, vec![project, over]);
    }

    #[test]
    fn test_load_or_error_fails_when_no_config() {
        let result = loader().without_boundary_marker().load_or_error();
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("gitver"));
        }
    }

    #[test]
    fn test_ignore_policy() {
        use chrono::TimeZone;
        let when = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .unwrap();
        let commit = Commit {
            sha: "abc1234def".into(),
            parents: vec![],
            message: String::new(),
            when,
        };

        let by_sha = IgnoreConfig {
            shas: BTreeSet::from(["abc1234".to_string()]),
            ..IgnoreConfig::default()
        };
        assert!(by_sha.is_ignored(&commit));

        let by_date = IgnoreConfig {
            before: Some(when),
            ..IgnoreConfig::default()
        };
        assert!(by_date.is_ignored(&commit));

        let earlier = IgnoreConfig {
            before: Some(when - chrono::Duration::days(1)),
            ..IgnoreConfig::default()
        };
        assert!(!earlier.is_ignored(&commit));
        assert!(!IgnoreConfig::default().is_ignored(&commit));
    }

    #[test]
    fn test_branch_fragment_merge_only_overrides_set_fields() {
        let mut base = BranchConfig {
            label: Some("alpha".into()),
            increment: Some(IncrementStrategy::Minor),
            ..BranchConfig::default()
        };
        base.merge_from(&BranchConfig {
            label: Some("beta".into()),
            ..BranchConfig::default()
        });
        assert_eq!(base.label.as_deref(), Some("beta"));
        assert_eq!(base.increment, Some(IncrementStrategy::Minor));
    }
}
