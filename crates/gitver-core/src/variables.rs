//! Output variables.
//!
//! [`GitVersionVariables`] is the flat, string-valued view of a finished
//! version that CI scripts consume. It is written as pretty JSON with sorted
//! keys and read back tolerantly: keys match case-insensitively, unknown keys
//! are dropped, and numbers or booleans are accepted as strings.

use std::fmt::Write as _;
use std::fs;
use std::io;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retry::{RetryPolicy, with_retry};
use crate::version::{SemanticVersion, escape_branch_name};

/// Weight given to release versions so they sort after every pre-release.
const RELEASE_WEIGHT: u64 = 60_000;

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Variables written as `null` when unset.
const NULLABLE: &[&str] = &[
    "BuildMetaData",
    "CommitDate",
    "PreReleaseNumber",
    "Sha",
    "ShortSha",
    "VersionSourceSha",
];

/// The calculated version, flattened for consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
#[allow(missing_docs)]
pub struct GitVersionVariables {
    pub major: String,
    pub minor: String,
    pub patch: String,
    pub pre_release_tag: String,
    pub pre_release_tag_with_dash: String,
    pub pre_release_label: String,
    pub pre_release_label_with_dash: String,
    pub pre_release_number: Option<String>,
    pub weighted_pre_release_number: String,
    pub build_meta_data: Option<String>,
    pub full_build_meta_data: String,
    pub major_minor_patch: String,
    pub sem_ver: String,
    pub full_sem_ver: String,
    pub informational_version: String,
    pub branch_name: String,
    pub escaped_branch_name: String,
    pub sha: Option<String>,
    pub short_sha: Option<String>,
    pub version_source_sha: Option<String>,
    pub commits_since_version_source: String,
    pub uncommitted_changes: String,
    pub commit_date: Option<String>,
}

/// Every variable name, in serialized (sorted) order.
pub const VARIABLE_NAMES: &[&str] = &[
    "BranchName",
    "BuildMetaData",
    "CommitDate",
    "CommitsSinceVersionSource",
    "EscapedBranchName",
    "FullBuildMetaData",
    "FullSemVer",
    "InformationalVersion",
    "Major",
    "MajorMinorPatch",
    "Minor",
    "Patch",
    "PreReleaseLabel",
    "PreReleaseLabelWithDash",
    "PreReleaseNumber",
    "PreReleaseTag",
    "PreReleaseTagWithDash",
    "SemVer",
    "Sha",
    "ShortSha",
    "UncommittedChanges",
    "VersionSourceSha",
    "WeightedPreReleaseNumber",
];

impl GitVersionVariables {
    /// Flatten a finalized version.
    ///
    /// `commit_date_format` is a `strftime` pattern; an invalid one falls
    /// back to `%Y-%m-%d`.
    pub fn from_version(version: &SemanticVersion, commit_date_format: &str) -> Self {
        let metadata = version.build_metadata.clone().unwrap_or_default();
        let tag = version.pre_release_tag.as_ref();
        let pre_release_tag = tag.map(ToString::to_string).unwrap_or_default();
        let pre_release_label = tag.map(|t| t.name.clone()).unwrap_or_default();
        let pre_release_number = tag.and_then(|t| t.number);
        let weighted = match tag {
            Some(t) if !pre_release_tag.is_empty() => t.number.unwrap_or_default(),
            _ => RELEASE_WEIGHT,
        };
        let branch_name = metadata.branch.clone().unwrap_or_default();

        Self {
            major: version.major.to_string(),
            minor: version.minor.to_string(),
            patch: version.patch.to_string(),
            pre_release_tag_with_dash: with_dash(&pre_release_tag),
            pre_release_tag,
            pre_release_label_with_dash: with_dash(&pre_release_label),
            pre_release_label,
            pre_release_number: pre_release_number.map(|n| n.to_string()),
            weighted_pre_release_number: weighted.to_string(),
            build_meta_data: metadata.short(),
            full_build_meta_data: metadata.full(),
            major_minor_patch: version.major_minor_patch(),
            sem_ver: version.sem_ver(),
            full_sem_ver: version.full_sem_ver(),
            informational_version: version.informational_version(),
            escaped_branch_name: escape_branch_name(&branch_name),
            branch_name,
            sha: metadata.commit_sha.clone(),
            short_sha: metadata.commit_short_sha.clone(),
            version_source_sha: metadata.version_source_sha.clone(),
            commits_since_version_source: metadata.commits_since_version_source.to_string(),
            uncommitted_changes: metadata.uncommitted_changes.to_string(),
            commit_date: metadata.commit_date.map(|d| format_date(&d, commit_date_format)),
        }
    }

    /// Look up a variable by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        let (_, found) = value
            .as_object()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(found.as_str().unwrap_or_default().to_string())
    }

    /// Every variable as `(name, value)` pairs in sorted order. Null values
    /// are rendered as empty strings.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let Ok(Value::Object(map)) = serde_json::to_value(self) else {
            return Vec::new();
        };
        map.into_iter()
            .map(|(k, v)| (k, v.as_str().unwrap_or_default().to_string()))
            .collect()
    }

    /// Indented JSON with sorted keys.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let value = serde_json::to_value(self)?;
        let sorted: std::collections::BTreeMap<String, Value> = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => std::collections::BTreeMap::new(),
        };
        serde_json::to_string_pretty(&sorted)
    }

    /// Parse JSON written by [`Self::to_json`] or by other tools.
    ///
    /// # Errors
    ///
    /// Fails when `json` is not a JSON object.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: Map<String, Value> = serde_json::from_str(json)?;
        let mut normalized = Map::new();
        for name in VARIABLE_NAMES {
            let Some((_, value)) = raw.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)) else {
                continue;
            };
            let value = match value {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                // Absent and null are the same for required strings.
                Value::Null if !NULLABLE.contains(name) => continue,
                other => other.clone(),
            };
            normalized.insert((*name).to_string(), value);
        }
        serde_json::from_value(Value::Object(normalized))
    }

    /// Write [`Self::to_json`] to `path`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last I/O error once retries are exhausted.
    pub fn to_file(&self, path: &Utf8Path, policy: RetryPolicy) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        with_retry(policy, || fs::write(path, &json))
    }

    /// Read variables from `path`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last I/O error, or an `InvalidData` error for bad JSON.
    pub fn from_file(path: &Utf8Path, policy: RetryPolicy) -> io::Result<Self> {
        let text = with_retry(policy, || fs::read_to_string(path))?;
        Self::from_json(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn with_dash(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("-{text}")
    }
}

fn format_date(date: &chrono::DateTime<chrono::FixedOffset>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(format)).is_ok() {
        return out;
    }
    tracing::debug!(format, "invalid commit date format, using default");
    date.format(FALLBACK_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{BuildMetaData, PreReleaseTag};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample() -> SemanticVersion {
        let when = chrono::FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 12, 0, 0)
            .unwrap();
        SemanticVersion::new(1, 2, 3)
            .with_pre_release(Some(PreReleaseTag::new("beta", Some(4))))
            .with_build_metadata(Some(BuildMetaData {
                commits_since_tag: Some(5),
                commits_since_version_source: 5,
                version_source_sha: Some("abc".into()),
                branch: Some("release/1.2.3".into()),
                commit_sha: Some("0123456789abcdef".into()),
                commit_short_sha: Some("0123456".into()),
                commit_date: Some(when),
                uncommitted_changes: 0,
                other_metadata: None,
            }))
    }

    #[test]
    fn flattens_version() {
        let vars = GitVersionVariables::from_version(&sample(), "%Y-%m-%d");
        assert_eq!(vars.major, "1");
        assert_eq!(vars.pre_release_tag, "beta.4");
        assert_eq!(vars.pre_release_tag_with_dash, "-beta.4");
        assert_eq!(vars.pre_release_label, "beta");
        assert_eq!(vars.pre_release_number.as_deref(), Some("4"));
        assert_eq!(vars.weighted_pre_release_number, "4");
        assert_eq!(vars.build_meta_data.as_deref(), Some("5"));
        assert_eq!(vars.full_sem_ver, "1.2.3-beta.4+5");
        assert_eq!(vars.escaped_branch_name, "release-1-2-3");
        assert_eq!(vars.commit_date.as_deref(), Some("2024-03-09"));
        assert_eq!(vars.short_sha.as_deref(), Some("0123456"));
    }

    #[test]
    fn release_version_weight() {
        let vars = GitVersionVariables::from_version(&SemanticVersion::new(2, 0, 0), "%Y");
        assert_eq!(vars.pre_release_tag, "");
        assert_eq!(vars.pre_release_number, None);
        assert_eq!(vars.weighted_pre_release_number, "60000");
        assert_eq!(vars.commit_date, None);
    }

    #[test]
    fn invalid_date_format_falls_back() {
        let vars = GitVersionVariables::from_version(&sample(), "%Q");
        assert_eq!(vars.commit_date.as_deref(), Some("2024-03-09"));
    }

    #[test]
    fn json_keys_are_sorted_and_round_trip() {
        let vars = GitVersionVariables::from_version(&sample(), "%Y-%m-%d");
        let json = vars.to_json().unwrap();

        let keys: Vec<_> = json
            .lines()
            .filter_map(|line| line.trim().strip_prefix('"'))
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(keys, VARIABLE_NAMES);
        assert!(json.contains("\"PreReleaseNumber\": \"4\""));

        assert_eq!(GitVersionVariables::from_json(&json).unwrap(), vars);
    }

    #[test]
    fn nulls_are_written_as_null() {
        let json = GitVersionVariables::default().to_json().unwrap();
        assert!(json.contains("\"Sha\": null"));
    }

    #[test]
    fn tolerant_read() {
        let json = r#"{
            "major": 3,
            "SEMVER": "3.0.0",
            "UncommittedChanges": 0,
            "Sha": null,
            "BranchName": null,
            "Unknown": true
        }"#;
        let vars = GitVersionVariables::from_json(json).unwrap();
        assert_eq!(vars.major, "3");
        assert_eq!(vars.sem_ver, "3.0.0");
        assert_eq!(vars.uncommitted_changes, "0");
        assert_eq!(vars.sha, None);
        assert_eq!(vars.branch_name, "");
        assert_eq!(vars.minor, "");
    }

    #[test]
    fn lookup_by_name() {
        let vars = GitVersionVariables::from_version(&sample(), "%Y-%m-%d");
        assert_eq!(vars.get("semver").as_deref(), Some("1.2.3-beta.4"));
        assert_eq!(vars.get("Nope"), None);
        assert_eq!(vars.pairs().len(), VARIABLE_NAMES.len());
    }

    #[test]
    fn file_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = camino::Utf8PathBuf::try_from(tmp.path().join("version.json")).unwrap();
        let vars = GitVersionVariables::from_version(&sample(), "%Y-%m-%d");

        vars.to_file(&path, RetryPolicy::none()).unwrap();
        let back = GitVersionVariables::from_file(&path, RetryPolicy::none()).unwrap();
        assert_eq!(back, vars);
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let path = camino::Utf8PathBuf::try_from(tmp.path().join("absent.json")).unwrap();
        let err = GitVersionVariables::from_file(&path, RetryPolicy::none()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
