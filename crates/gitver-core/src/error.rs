//! Error types for gitver-core

use thiserror::Error;

/// Errors that can occur when loading or compiling configuration.
///
/// Every variant is reported before any version is computed and is fatal to
/// the run.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,

    /// A configured regular expression does not compile.
    #[error("invalid pattern for {name} ({pattern}): {source}")]
    InvalidPattern {
        /// Name of the setting or entry that owns the pattern.
        name: String,
        /// The offending pattern text.
        pattern: String,
        /// Compilation error from the regex engine.
        #[source]
        source: Box<regex::Error>,
    },

    /// A branch matched no configured pattern and no `unknown` fallback exists.
    #[error("no branch configuration matches '{branch}' and no 'unknown' fallback is configured")]
    NoBranchConfiguration {
        /// The branch that could not be resolved.
        branch: String,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidPattern`] from a regex compilation failure.
    pub fn invalid_pattern(name: impl Into<String>, pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            name: name.into(),
            pattern: pattern.to_string(),
            source: Box::new(source),
        }
    }
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Compile a configured pattern, mapping failures to [`ConfigError::InvalidPattern`].
pub(crate) fn compile_pattern(name: &str, pattern: &str) -> ConfigResult<regex::Regex> {
    regex::Regex::new(pattern).map_err(|e| ConfigError::invalid_pattern(name, pattern, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_pattern_reports_owner_and_text() {
        let err = compile_pattern("merge-message-formats.broken", "(unclosed").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("merge-message-formats.broken"), "{msg}");
        assert!(msg.contains("(unclosed"), "{msg}");
    }

    #[test]
    fn no_branch_configuration_names_branch() {
        let err = ConfigError::NoBranchConfiguration {
            branch: "wip/thing".into(),
        };
        assert!(err.to_string().contains("wip/thing"));
    }
}
