//! Semantic version value types.
//!
//! [`SemanticVersion`] is the currency of the engine: strategies propose
//! them, the calculator increments them and the deployment finalizers attach
//! [`BuildMetaData`]. Values are never mutated in place; every transformation
//! returns a new version.

mod parse;

pub use parse::TagPrefix;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from version calculation entry points.
#[derive(Error, Debug)]
pub enum VersionError {
    /// A required input was missing.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Configuration could not be compiled or resolved.
    #[error(transparent)]
    Config(#[from] crate::error::ConfigError),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// The version component an increment applies to.
///
/// Variants are declared in severity order so the derived `Ord` ranks
/// `Major > Minor > Patch > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionField {
    /// Leave the version as it is.
    None,
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for VersionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// A pre-release label such as `beta.4`.
///
/// Names compare ASCII case-insensitively; a missing number sorts before any
/// number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreReleaseTag {
    /// Label text (`beta`, `alpha`, a branch name, ...). May be empty.
    pub name: String,
    /// Running pre-release number.
    pub number: Option<u64>,
}

impl PreReleaseTag {
    /// Create a tag with a name and optional number.
    pub fn new(name: impl Into<String>, number: Option<u64>) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }

    /// Whether `other` carries the same label, ignoring ASCII case.
    pub fn same_label(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for PreReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.number) {
            (false, Some(n)) => write!(f, "{}.{n}", self.name),
            (false, None) => write!(f, "{}", self.name),
            (true, Some(n)) => write!(f, "{n}"),
            (true, None) => Ok(()),
        }
    }
}

impl Ord for PreReleaseTag {
    fn cmp(&self, other: &Self) -> Ordering {
        let ours = self.name.to_ascii_lowercase();
        let theirs = other.name.to_ascii_lowercase();
        ours.cmp(&theirs).then(self.number.cmp(&other.number))
    }
}

impl PartialOrd for PreReleaseTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PreReleaseTag {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PreReleaseTag {}

impl Hash for PreReleaseTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.number.hash(state);
    }
}

/// Build metadata attached by the deployment finalizers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetaData {
    /// Commits between the version source and the current commit, when the
    /// deployment mode keeps it.
    pub commits_since_tag: Option<u64>,
    /// Commits between the version source and the current commit.
    pub commits_since_version_source: u64,
    /// Sha of the commit the base version is anchored to.
    pub version_source_sha: Option<String>,
    /// Branch the version was calculated on.
    pub branch: Option<String>,
    /// Full sha of the current commit.
    pub commit_sha: Option<String>,
    /// Seven-character abbreviation of [`Self::commit_sha`].
    pub commit_short_sha: Option<String>,
    /// Timestamp of the current commit.
    pub commit_date: Option<DateTime<FixedOffset>>,
    /// Number of uncommitted changes in the working tree.
    pub uncommitted_changes: u64,
    /// Metadata text that could not be interpreted (from a parsed tag).
    pub other_metadata: Option<String>,
}

impl BuildMetaData {
    /// The short metadata form: the commit count, if present.
    pub fn short(&self) -> Option<String> {
        self.commits_since_tag.map(|n| n.to_string())
    }

    /// The full metadata form, e.g. `5.Branch.main.Sha.1a2b3c4d...`.
    pub fn full(&self) -> String {
        let mut parts = Vec::new();
        if let Some(n) = self.commits_since_tag {
            parts.push(n.to_string());
        }
        if let Some(ref branch) = self.branch {
            parts.push(format!("Branch.{}", escape_branch_name(branch)));
        }
        if let Some(ref sha) = self.commit_sha {
            parts.push(format!("Sha.{sha}"));
        }
        if let Some(ref other) = self.other_metadata {
            parts.push(other.clone());
        }
        parts.join(".")
    }
}

/// A semantic version with optional pre-release tag and build metadata.
///
/// Ordering and equality follow SemVer precedence and ignore build metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticVersion {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Optional pre-release tag.
    pub pre_release_tag: Option<PreReleaseTag>,
    /// Optional build metadata.
    pub build_metadata: Option<BuildMetaData>,
}

impl SemanticVersion {
    /// Create a release version with no tag and no metadata.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release_tag: None,
            build_metadata: None,
        }
    }

    /// Return a copy with the given pre-release tag.
    #[must_use]
    pub fn with_pre_release(mut self, tag: Option<PreReleaseTag>) -> Self {
        self.pre_release_tag = tag;
        self
    }

    /// Return a copy with the given build metadata.
    #[must_use]
    pub fn with_build_metadata(mut self, metadata: Option<BuildMetaData>) -> Self {
        self.build_metadata = metadata;
        self
    }

    /// Return the version incremented by `field`.
    ///
    /// A version carrying a pre-release tag bumps the tag's number instead of
    /// a version component. A component already at `u64::MAX` cannot move, so
    /// the version is returned unchanged rather than wrapping.
    #[must_use]
    pub fn increment(&self, field: VersionField) -> Self {
        self.checked_increment(field).unwrap_or_else(|| {
            tracing::warn!(version = %self, ?field, "version component overflow, not incremented");
            self.clone()
        })
    }

    /// Like [`SemanticVersion::increment`], returning `None` on overflow.
    pub fn checked_increment(&self, field: VersionField) -> Option<Self> {
        let mut next = self.clone();
        if field == VersionField::None {
            return Some(next);
        }
        if let Some(ref mut tag) = next.pre_release_tag {
            tag.number = Some(match tag.number {
                Some(n) => n.checked_add(1)?,
                None => 1,
            });
            return Some(next);
        }
        match field {
            VersionField::Major => {
                next.major = next.major.checked_add(1)?;
                next.minor = 0;
                next.patch = 0;
            }
            VersionField::Minor => {
                next.minor = next.minor.checked_add(1)?;
                next.patch = 0;
            }
            VersionField::Patch => next.patch = next.patch.checked_add(1)?,
            VersionField::None => {}
        }
        Some(next)
    }

    /// `major.minor.patch`
    pub fn major_minor_patch(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// `major.minor.patch[-tag]`
    pub fn sem_ver(&self) -> String {
        match self.pre_release_tag {
            Some(ref tag) if !tag.to_string().is_empty() => {
                format!("{}-{tag}", self.major_minor_patch())
            }
            _ => self.major_minor_patch(),
        }
    }

    /// `SemVer[+commitsSinceTag]`
    pub fn full_sem_ver(&self) -> String {
        match self.build_metadata.as_ref().and_then(BuildMetaData::short) {
            Some(short) => format!("{}+{short}", self.sem_ver()),
            None => self.sem_ver(),
        }
    }

    /// `SemVer+<full metadata>`
    pub fn informational_version(&self) -> String {
        match self.build_metadata.as_ref().map(BuildMetaData::full) {
            Some(full) if !full.is_empty() => format!("{}+{full}", self.sem_ver()),
            _ => self.sem_ver(),
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sem_ver())
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre_release_tag, &other.pre_release_tag) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.pre_release_tag.hash(state);
    }
}

/// Replace every character that is not ASCII alphanumeric with `-`.
pub fn escape_branch_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
