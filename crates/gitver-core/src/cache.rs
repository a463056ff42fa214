//! Version cache.
//!
//! Calculating a version walks the whole history; CI jobs often ask for the
//! same commit many times. Results are cached under a [`Fingerprint`] of
//! everything that influences them. Entries never expire: a fingerprint that
//! matches returns the stored variables verbatim.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Config;
use crate::engine::CalculateOptions;
use crate::repository::RepositorySnapshot;
use crate::retry::{RetryPolicy, with_retry};
use crate::variables::GitVersionVariables;

/// Errors from cache storage.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing a cache file failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    /// A cache entry could not be encoded.
    #[error("cache encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// SHA-256 over the inputs of a calculation, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a commit, configuration and invocation options.
    ///
    /// # Errors
    ///
    /// Fails only if the configuration cannot be serialized.
    pub fn compute(commit_sha: &str, config: &Config, options: &CalculateOptions) -> CacheResult<Self> {
        Self::digest(&[commit_sha.as_bytes()], config, options)
    }

    /// Fingerprint the current state of `repository`: its commit, branch and
    /// working-tree change count.
    ///
    /// # Errors
    ///
    /// Fails only if the configuration cannot be serialized.
    pub fn for_snapshot(
        repository: &dyn RepositorySnapshot,
        config: &Config,
        options: &CalculateOptions,
    ) -> CacheResult<Self> {
        let commit = repository.current_commit();
        let branch = repository.current_branch();
        let uncommitted = repository.uncommitted_change_count().to_string();
        Self::digest(
            &[
                commit.sha.as_bytes(),
                branch.name.as_bytes(),
                uncommitted.as_bytes(),
            ],
            config,
            options,
        )
    }

    fn digest(parts: &[&[u8]], config: &Config, options: &CalculateOptions) -> CacheResult<Self> {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
            hasher.update(b"\0");
        }
        hasher.update(serde_json::to_vec(config)?);
        hasher.update(b"\0");
        hasher.update(serde_json::to_vec(options)?);
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for calculated variables.
pub trait VersionCache {
    /// The stored variables for `key`, if any.
    fn get(&self, key: &Fingerprint) -> Option<GitVersionVariables>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be stored.
    fn put(&mut self, key: &Fingerprint, value: GitVersionVariables) -> CacheResult<()>;
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryVersionCache {
    entries: HashMap<Fingerprint, GitVersionVariables>,
}

impl MemoryVersionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionCache for MemoryVersionCache {
    fn get(&self, key: &Fingerprint) -> Option<GitVersionVariables> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &Fingerprint, value: GitVersionVariables) -> CacheResult<()> {
        self.entries.insert(key.clone(), value);
        Ok(())
    }
}

/// One `<fingerprint>.json` file per entry under a directory.
#[derive(Debug, Clone)]
pub struct FileVersionCache {
    dir: Utf8PathBuf,
    policy: RetryPolicy,
}

impl FileVersionCache {
    /// Use `dir` for entries. The directory is created on first write.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            policy: RetryPolicy::default(),
        }
    }

    /// The cache under the user cache directory, if the platform has one.
    pub fn in_user_cache() -> Option<Self> {
        crate::config::user_cache_dir().map(|dir| Self::new(dir.join("versions")))
    }

    /// Override the retry policy for cache file I/O.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Number of stored entries. A missing directory holds none.
    pub fn entry_count(&self) -> usize {
        std::fs::read_dir(&self.dir).map_or(0, |entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                .count()
        })
    }

    fn entry_path(&self, key: &Fingerprint) -> Utf8PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl VersionCache for FileVersionCache {
    fn get(&self, key: &Fingerprint) -> Option<GitVersionVariables> {
        let path = self.entry_path(key);
        if !path.is_file() {
            tracing::debug!(%path, "version cache miss");
            return None;
        }
        match GitVersionVariables::from_file(&path, self.policy) {
            Ok(variables) => {
                tracing::debug!(%path, "version cache hit");
                Some(variables)
            }
            Err(err) => {
                tracing::warn!(%path, error = %err, "unreadable cache entry, recalculating");
                None
            }
        }
    }

    #[tracing::instrument(skip(self, value), fields(dir = %self.dir))]
    fn put(&mut self, key: &Fingerprint, value: GitVersionVariables) -> CacheResult<()> {
        let json = value.to_json()?;
        let path = self.entry_path(key);
        with_retry(self.policy, || {
            std::fs::create_dir_all(&self.dir)?;
            let mut tmp = NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(json.as_bytes())?;
            tmp.persist(&path)?;
            Ok(())
        })?;
        tracing::debug!(%path, "version cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::DeploymentMode;
    use tempfile::TempDir;

    fn variables(sem_ver: &str) -> GitVersionVariables {
        GitVersionVariables {
            sem_ver: sem_ver.to_string(),
            ..GitVersionVariables::default()
        }
    }

    fn key(sha: &str) -> Fingerprint {
        Fingerprint::compute(sha, &Config::default(), &CalculateOptions::default()).unwrap()
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = key("abc");
        assert_eq!(a, key("abc"));
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_changes_with_inputs() {
        let base = key("abc");
        assert_ne!(base, key("abd"));

        let config = Config {
            next_version: Some("2.0.0".into()),
            ..Config::default()
        };
        let other_config = Fingerprint::compute("abc", &config, &CalculateOptions::default()).unwrap();
        assert_ne!(base, other_config);

        let options = CalculateOptions {
            mode: Some(DeploymentMode::ContinuousDeployment),
            ..CalculateOptions::default()
        };
        let other_options = Fingerprint::compute("abc", &Config::default(), &options).unwrap();
        assert_ne!(base, other_options);
    }

    #[test]
    fn memory_cache_hit_and_miss() {
        let mut cache = MemoryVersionCache::new();
        assert_eq!(cache.get(&key("a")), None);
        cache.put(&key("a"), variables("1.0.0")).unwrap();
        assert_eq!(cache.get(&key("a")), Some(variables("1.0.0")));
        assert_eq!(cache.get(&key("b")), None);
    }

    #[test]
    fn file_cache_round_trip() {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().join("cache")).unwrap();
        let mut cache = FileVersionCache::new(&dir).with_retry_policy(RetryPolicy::none());

        assert_eq!(cache.get(&key("a")), None);
        cache.put(&key("a"), variables("1.2.3")).unwrap();
        assert!(dir.join(format!("{}.json", key("a"))).is_file());

        let reopened = FileVersionCache::new(&dir);
        assert_eq!(reopened.get(&key("a")), Some(variables("1.2.3")));
    }

    #[test]
    fn entry_count_ignores_temporaries() {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().join("versions")).unwrap();
        let mut cache = FileVersionCache::new(&dir).with_retry_policy(RetryPolicy::none());
        assert_eq!(cache.entry_count(), 0);

        cache.put(&key("a"), variables("1.0.0")).unwrap();
        cache.put(&key("b"), variables("1.0.1")).unwrap();
        std::fs::write(dir.join(".tmpXYZ"), "partial").unwrap();
        assert_eq!(cache.entry_count(), 2);
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        std::fs::write(dir.join(format!("{}.json", key("a"))), "not json").unwrap();

        let cache = FileVersionCache::new(&dir).with_retry_policy(RetryPolicy::none());
        assert_eq!(cache.get(&key("a")), None);
    }
}
