//! The version engine.
//!
//! [`Engine`] compiles a [`Config`] once (tag prefix, merge formats, branch
//! patterns, increment markers) and then calculates versions for any number
//! of repository snapshots.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::branch_config::BranchConfigurationResolver;
use crate::cache::{Fingerprint, VersionCache};
use crate::calculator::{NextVersion, NextVersionCalculator};
use crate::config::Config;
use crate::context::CalculationContext;
use crate::deployment::{BuildMetadataBuilder, DeploymentMode, finalize};
use crate::error::ConfigResult;
use crate::increment::IncrementMarkers;
use crate::merge_message::MergeMessageClassifier;
use crate::repository::{Branch, RepositorySnapshot};
use crate::variables::GitVersionVariables;
use crate::version::{SemanticVersion, TagPrefix};

/// Per-invocation overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculateOptions {
    /// Calculate as if this branch were checked out.
    pub target_branch: Option<String>,
    /// Deployment mode for this run, regardless of branch configuration.
    pub mode: Option<DeploymentMode>,
}

/// The outcome of one calculation.
#[derive(Debug, Clone)]
pub struct Calculation {
    /// Final version including build metadata.
    pub version: SemanticVersion,
    /// Calculator output the version was finalized from.
    pub next: NextVersion,
    /// Output variables.
    pub variables: GitVersionVariables,
}

/// Compiled configuration plus the strategy registry.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    tag_prefix: TagPrefix,
    classifier: MergeMessageClassifier,
    resolver: BranchConfigurationResolver,
    markers: IncrementMarkers,
    calculator: NextVersionCalculator,
}

impl Engine {
    /// Compile `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidPattern`] for any pattern in the
    /// configuration that does not compile.
    pub fn new(config: &Config) -> ConfigResult<Self> {
        Ok(Self {
            tag_prefix: config.tag_prefix()?,
            classifier: MergeMessageClassifier::new(config)?,
            resolver: BranchConfigurationResolver::new(config)?,
            markers: IncrementMarkers::new(config)?,
            calculator: NextVersionCalculator::default(),
            config: config.clone(),
        })
    }

    /// The configuration this engine was built from.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Branch configuration resolver.
    pub const fn resolver(&self) -> &BranchConfigurationResolver {
        &self.resolver
    }

    /// Calculate the version of `repository`'s current commit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::NoBranchConfiguration`] when no branch
    /// fragment applies to the branch being versioned.
    #[instrument(skip_all, fields(branch = options.target_branch.as_deref()))]
    pub fn calculate(
        &self,
        repository: &dyn RepositorySnapshot,
        options: &CalculateOptions,
    ) -> ConfigResult<Calculation> {
        let ctx = self.context(repository, options);
        let mut effective = ctx.effective_configuration()?;
        if let Some(mode) = options.mode {
            effective.mode = mode;
        }

        let next = self.calculator.calculate(&ctx, &effective);
        let metadata =
            BuildMetadataBuilder::new(&ctx).build(next.base_version.base_version_source.as_ref());
        let version = finalize(effective.mode, next.version.clone(), metadata);
        debug!(
            version = %version.full_sem_ver(),
            branch = ctx.current_branch.friendly_name(),
            source = %next.base_version.source,
            mode = %effective.mode,
            "version calculated"
        );

        let variables = GitVersionVariables::from_version(&version, &self.config.commit_date_format);
        Ok(Calculation {
            version,
            next,
            variables,
        })
    }

    /// Like [`Engine::calculate`] but consults `cache` first.
    ///
    /// Cache failures are logged and never fail the calculation.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::calculate`].
    pub fn calculate_cached(
        &self,
        repository: &dyn RepositorySnapshot,
        options: &CalculateOptions,
        cache: &mut dyn VersionCache,
    ) -> ConfigResult<GitVersionVariables> {
        let key = match Fingerprint::for_snapshot(repository, &self.config, options) {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "cannot fingerprint calculation, skipping cache");
                return Ok(self.calculate(repository, options)?.variables);
            }
        };
        if let Some(variables) = cache.get(&key) {
            debug!(%key, "using cached version");
            return Ok(variables);
        }
        debug!(%key, "no cached version");

        let variables = self.calculate(repository, options)?.variables;
        if let Err(err) = cache.put(&key, variables.clone()) {
            warn!(%key, error = %err, "failed to store version in cache");
        }
        Ok(variables)
    }

    fn context<'a>(
        &'a self,
        repository: &'a dyn RepositorySnapshot,
        options: &CalculateOptions,
    ) -> CalculationContext<'a> {
        let (current_branch, current_commit) = match options.target_branch.as_deref() {
            Some(name) => {
                let branch = find_branch(repository, name);
                let commit = branch
                    .tip
                    .as_deref()
                    .and_then(|tip| repository.commit(tip))
                    .unwrap_or_else(|| repository.current_commit());
                (branch, commit)
            }
            None => (repository.current_branch(), repository.current_commit()),
        };
        CalculationContext {
            repository,
            config: &self.config,
            resolver: &self.resolver,
            classifier: &self.classifier,
            markers: &self.markers,
            tag_prefix: &self.tag_prefix,
            current_branch,
            current_commit,
        }
    }
}

/// Local branch `name`, else a remote-tracking branch with that friendly
/// name, else a branch at HEAD with that name.
fn find_branch(repository: &dyn RepositorySnapshot, name: &str) -> Branch {
    let branches = repository.branches();
    branches
        .iter()
        .find(|b| !b.is_remote && b.name == name)
        .or_else(|| branches.iter().find(|b| b.is_remote && b.friendly_name() == name))
        .cloned()
        .unwrap_or_else(|| Branch::new(name, repository.current_commit().sha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryVersionCache;
    use crate::config::BranchConfig;
    use crate::error::ConfigError;
    use crate::repository::fixture::{RepoBuilder, sha};

    fn gitflow() -> crate::repository::InMemoryRepository {
        // a (v1.0.0) - b - c (main)
        //               \
        //                d - e (develop)
        RepoBuilder::new()
            .commit("a", &[], "initial")
            .commit("b", &["a"], "fix")
            .commit("c", &["b"], "another fix")
            .commit("d", &["b"], "feature")
            .commit("e", &["d"], "more")
            .branch("main", "c")
            .branch("develop", "e")
            .tag("v1.0.0", "a")
            .on("main")
    }

    #[test]
    fn calculates_main_in_continuous_delivery() {
        let engine = Engine::new(&Config::default()).unwrap();
        let result = engine.calculate(&gitflow(), &CalculateOptions::default()).unwrap();

        let vars = &result.variables;
        assert_eq!(vars.major_minor_patch, "1.0.1");
        assert_eq!(vars.sem_ver, "1.0.1");
        assert_eq!(vars.commits_since_version_source, "2");
        assert_eq!(vars.branch_name, "main");
        assert_eq!(vars.sha.as_deref(), Some(sha("c").as_str()));
        assert_eq!(vars.version_source_sha.as_deref(), Some(sha("a").as_str()));
    }

    #[test]
    fn target_branch_override() {
        let engine = Engine::new(&Config::default()).unwrap();
        let options = CalculateOptions {
            target_branch: Some("develop".into()),
            ..CalculateOptions::default()
        };
        let result = engine.calculate(&gitflow(), &options).unwrap();
        assert_eq!(result.variables.branch_name, "develop");
        assert_eq!(result.variables.sha.as_deref(), Some(sha("e").as_str()));
        assert_eq!(result.variables.major_minor_patch, "1.1.0");
        assert_eq!(result.variables.pre_release_label, "alpha");
        assert_eq!(result.variables.sem_ver, "1.1.0-alpha.3");
    }

    #[test]
    fn unknown_target_branch_versions_head() {
        let engine = Engine::new(&Config::default()).unwrap();
        let options = CalculateOptions {
            target_branch: Some("feature/login".into()),
            ..CalculateOptions::default()
        };
        let result = engine.calculate(&gitflow(), &options).unwrap();
        assert_eq!(result.variables.sha.as_deref(), Some(sha("c").as_str()));
        assert_eq!(result.variables.branch_name, "feature/login");
    }

    #[test]
    fn mode_override_applies() {
        let engine = Engine::new(&Config::default()).unwrap();
        let options = CalculateOptions {
            target_branch: Some("develop".into()),
            mode: Some(DeploymentMode::ContinuousDeployment),
        };
        let result = engine.calculate(&gitflow(), &options).unwrap();
        assert_eq!(result.variables.sem_ver, "1.1.0");
        assert_eq!(result.variables.pre_release_tag, "");
        assert!(result.version.pre_release_tag.is_none());
    }

    #[test]
    fn zero_numbered_pre_release_tag_with_blocked_increment() {
        let repo = RepoBuilder::new()
            .commit("a", &[], "initial")
            .commit("b", &["a"], "start 1.1")
            .commit("c", &["b"], "docs +semver: none")
            .branch("main", "a")
            .branch("develop", "c")
            .tag("v1.0.0", "a")
            .tag("v1.1.0-alpha.0", "b")
            .on("develop");
        let engine = Engine::new(&Config::default()).unwrap();
        let result = engine.calculate(&repo, &CalculateOptions::default()).unwrap();
        assert_eq!(result.variables.major_minor_patch, "1.1.0");
        assert_eq!(result.variables.pre_release_label, "alpha");
    }

    #[test]
    fn missing_branch_configuration_is_an_error() {
        let mut config = Config::default();
        config.branches = [(
            "main".to_string(),
            BranchConfig {
                regex: Some("^main$".into()),
                ..BranchConfig::default()
            },
        )]
        .into();
        let engine = Engine::new(&config).unwrap();
        let options = CalculateOptions {
            target_branch: Some("topic".into()),
            ..CalculateOptions::default()
        };
        let err = engine.calculate(&gitflow(), &options).unwrap_err();
        assert!(matches!(err, ConfigError::NoBranchConfiguration { .. }));
    }

    #[test]
    fn invalid_pattern_fails_at_construction() {
        let config = Config {
            tag_prefix: Some("(".into()),
            ..Config::default()
        };
        assert!(matches!(
            Engine::new(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn cached_calculation_reuses_entry() {
        let engine = Engine::new(&Config::default()).unwrap();
        let repo = gitflow();
        let options = CalculateOptions::default();
        let mut cache = MemoryVersionCache::new();

        let first = engine.calculate_cached(&repo, &options, &mut cache).unwrap();
        let key = Fingerprint::for_snapshot(&repo, engine.config(), &options).unwrap();
        assert_eq!(cache.get(&key), Some(first.clone()));

        let mut doctored = first.clone();
        doctored.sem_ver = "9.9.9".into();
        cache.put(&key, doctored).unwrap();
        let second = engine.calculate_cached(&repo, &options, &mut cache).unwrap();
        assert_eq!(second.sem_ver, "9.9.9");
    }
}
