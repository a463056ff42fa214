//! Merge commit message classification.
//!
//! Recognizes the merge messages written by git itself, GitHub, Bitbucket
//! (server and v7), SmartGit and remote-tracking merges, plus any custom
//! formats from configuration. Custom formats are tried first, in declared
//! order; the first pattern that matches wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::error::{ConfigResult, compile_pattern};
use crate::version::{SemanticVersion, TagPrefix, VersionError, VersionResult};

/// Built-in formats in evaluation order.
const BUILT_IN_FORMATS: &[(&str, &str)] = &[
    (
        "Default",
        r"^Merge (branch|tag) '(?<SourceBranch>[^']*)'(?: into (?<TargetBranch>[^\s]*))*",
    ),
    (
        "GitHubPull",
        r"^Merge pull request #(?<PullRequestNumber>\d+) (from|in) (?<SourceBranch>[^\s]*)(?: into (?<TargetBranch>[^\s]*))?\s*(?:\r?\n|$)",
    ),
    (
        "BitBucketPull",
        r"^Merge pull request #(?<PullRequestNumber>\d+) (from|in) (?<Source>.*) from (?<SourceBranch>[^\s]*) to (?<TargetBranch>[^\s]*)",
    ),
    (
        "BitBucketPullv7",
        r"^Pull request #(?<PullRequestNumber>\d+).*\r?\n\r?\nMerge in (?<Source>.*) from (?<SourceBranch>[^\s]*) to (?<TargetBranch>[^\s]*)",
    ),
    (
        "SmartGit",
        r"^Finish (?<SourceBranch>[^\s]*)(?: into (?<TargetBranch>[^\s]*))*",
    ),
    (
        "RemoteTracking",
        r"^Merge remote-tracking branch '(?<SourceBranch>[^\s]*)'(?: into (?<TargetBranch>[^\s]*))*",
    ),
];

static BRANCH_PREFIXES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\w+[-/])*").expect("branch prefix regex is valid"));

static VERSION_LOCATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)*").expect("version locator regex is valid"));

/// The classification of a single commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeMessage {
    /// Name of the format that matched, if any.
    pub format_name: Option<String>,
    /// The merged (source) branch. Empty when nothing matched.
    pub merged_branch: String,
    /// The branch merged into, when the message names it.
    pub target_branch: Option<String>,
    /// Whether the message came from a merged pull request.
    pub is_merged_pull_request: bool,
    /// Pull request number, when captured.
    pub pull_request_number: Option<u64>,
    /// Version found in the merged branch name.
    pub version: Option<SemanticVersion>,
}

#[derive(Debug, Clone)]
struct MergeFormat {
    name: String,
    regex: Regex,
}

/// Compiled merge message patterns.
#[derive(Debug, Clone)]
pub struct MergeMessageClassifier {
    formats: Vec<MergeFormat>,
    tag_prefix: TagPrefix,
}

impl MergeMessageClassifier {
    /// Compile the custom and built-in formats.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidPattern`] when a custom format or
    /// the tag prefix does not compile.
    pub fn new(config: &Config) -> ConfigResult<Self> {
        let mut formats = Vec::with_capacity(config.merge_message_formats.len() + BUILT_IN_FORMATS.len());
        for custom in &config.merge_message_formats {
            formats.push(MergeFormat {
                name: custom.name.clone(),
                regex: compile_pattern(
                    &format!("merge_message_formats.{}", custom.name),
                    &custom.pattern,
                )?,
            });
        }
        for (name, pattern) in BUILT_IN_FORMATS {
            formats.push(MergeFormat {
                name: (*name).to_string(),
                regex: compile_pattern(name, pattern)?,
            });
        }
        Ok(Self {
            formats,
            tag_prefix: config.tag_prefix()?,
        })
    }

    /// Classify a message that may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidInput`] when `message` is `None`.
    pub fn try_classify(&self, message: Option<&str>) -> VersionResult<MergeMessage> {
        let message = message.ok_or(VersionError::InvalidInput("merge message is required"))?;
        Ok(self.classify(message))
    }

    /// Classify a commit message.
    pub fn classify(&self, message: &str) -> MergeMessage {
        if message.trim().is_empty() {
            return MergeMessage::default();
        }

        let Some((format, caps)) = self
            .formats
            .iter()
            .find_map(|f| f.regex.captures(message).map(|caps| (f, caps)))
        else {
            return MergeMessage::default();
        };

        let merged_branch = caps
            .name("SourceBranch")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let target_branch = caps
            .name("TargetBranch")
            .map(|m| m.as_str().to_string())
            .filter(|t| !t.is_empty());
        let pull_request_number = caps
            .name("PullRequestNumber")
            .and_then(|m| m.as_str().parse::<u64>().ok());
        let version = self.version_in(&merged_branch);

        MergeMessage {
            format_name: Some(format.name.clone()),
            merged_branch,
            target_branch,
            is_merged_pull_request: pull_request_number.is_some(),
            pull_request_number,
            version,
        }
    }

    fn version_in(&self, branch: &str) -> Option<SemanticVersion> {
        let stripped = BRANCH_PREFIXES.replace(branch, "");
        let stripped = self.tag_prefix.strip(&stripped);
        let token = VERSION_LOCATOR.find(stripped)?;
        SemanticVersion::from_numeric_token(token.as_str())
    }
}
