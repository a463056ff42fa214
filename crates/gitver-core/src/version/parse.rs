//! Tolerant version parsing.
//!
//! Parsing never fails loudly: anything that does not look like a version
//! yields `None` and the caller moves on.

use std::sync::LazyLock;

use regex::Regex;

use super::{BuildMetaData, PreReleaseTag, SemanticVersion};
use crate::error::{ConfigResult, compile_pattern};

const DEFAULT_TAG_PREFIX: &str = "[vV]";

static LOOSE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?(?:\.\d+)?(?:-(?P<tag>[0-9A-Za-z\-.]+))?(?:\+(?P<meta>[0-9A-Za-z\-.]+))?$",
    )
    .expect("loose version regex is valid")
});

/// Compiled tag-prefix matcher.
///
/// Anchored at the start of the input and case-insensitive. A missing or
/// blank pattern falls back to `[vV]`.
#[derive(Debug, Clone)]
pub struct TagPrefix {
    regex: Regex,
}

impl TagPrefix {
    /// Compile a tag prefix pattern.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidPattern`] when the pattern does
    /// not compile.
    pub fn new(pattern: Option<&str>) -> ConfigResult<Self> {
        let pattern = pattern
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_TAG_PREFIX);
        let regex = compile_pattern("tag-prefix", &format!("(?i)^(?:{pattern})"))?;
        Ok(Self { regex })
    }

    /// Remove the prefix from the start of `input`, if present.
    pub fn strip<'a>(&self, input: &'a str) -> &'a str {
        match self.regex.find(input) {
            Some(m) => &input[m.end()..],
            None => input,
        }
    }
}

impl Default for TagPrefix {
    fn default() -> Self {
        Self {
            regex: Regex::new(&format!("(?i)^(?:{DEFAULT_TAG_PREFIX})"))
                .expect("default tag prefix is valid"),
        }
    }
}

impl SemanticVersion {
    /// Parse a version, stripping `prefix` first.
    ///
    /// Strict SemVer 2.0 is tried first; the loose form accepts `4`, `4.1`,
    /// `4.1.2`, an ignored fourth component, `-label[.N]` and `+metadata`.
    pub fn parse(input: &str, prefix: &TagPrefix) -> Option<Self> {
        let rest = prefix.strip(input.trim());
        if let Ok(strict) = semver::Version::parse(rest) {
            return Some(Self {
                major: strict.major,
                minor: strict.minor,
                patch: strict.patch,
                pre_release_tag: (!strict.pre.is_empty())
                    .then(|| parse_pre_release(strict.pre.as_str())),
                build_metadata: (!strict.build.is_empty())
                    .then(|| parse_build_metadata(strict.build.as_str())),
            });
        }

        let caps = LOOSE_VERSION.captures(rest)?;
        let number = |name: &str| -> Option<u64> {
            caps.name(name).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        Some(Self {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            pre_release_tag: caps.name("tag").map(|m| parse_pre_release(m.as_str())),
            build_metadata: caps.name("meta").map(|m| parse_build_metadata(m.as_str())),
        })
    }

    /// Parse a bare dotted numeric token such as `4` or `4.1.0`.
    ///
    /// Missing trailing components are zero; a fourth component is ignored.
    pub fn from_numeric_token(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return None;
        }
        let mut numbers = [0_u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            *slot = part.parse().ok()?;
        }
        Some(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

/// Split `beta.4` / `beta4` / `4` into name and number.
fn parse_pre_release(text: &str) -> PreReleaseTag {
    let name_end = text.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (name, digits) = text.split_at(name_end);
    match digits.parse::<u64>() {
        Ok(number) => PreReleaseTag::new(name.strip_suffix('.').unwrap_or(name), Some(number)),
        Err(_) => PreReleaseTag::new(text, None),
    }
}

/// Leading digits are the commit count; anything else is kept verbatim.
fn parse_build_metadata(text: &str) -> BuildMetaData {
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, rest) = text.split_at(digits_end);
    let commits = digits.parse::<u64>().ok();
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    BuildMetaData {
        commits_since_tag: commits,
        commits_since_version_source: commits.unwrap_or_default(),
        other_metadata: (!rest.is_empty()).then(|| rest.to_string()),
        ..BuildMetaData::default()
    }
}
