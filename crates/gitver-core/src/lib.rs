//! Core library for gitver.
//!
//! Calculates semantic versions from git history: tags, merge messages,
//! branch names and configured floors each propose a base version, the
//! highest wins, and the branch's configuration decides how it is
//! incremented, labelled and finalized.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading and management
//! - [`engine`] - The entry point: compile a configuration, calculate versions
//! - [`repository`] - Read-only repository snapshots
//! - [`git`] - Loading a snapshot from a git working copy
//! - [`strategies`] - Base version strategies
//! - [`branch_config`] - Effective per-branch configuration
//! - [`merge_message`] - Merge commit message classification
//! - [`variables`] - Output variables and their JSON form
//! - [`cache`] - Version cache keyed by calculation fingerprint
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use gitver_core::{CalculateOptions, ConfigLoader, Engine};
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .with_project_search(".")
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let repo = gitver_core::git::load_snapshot(Utf8Path::new(".")).expect("not a repository");
//! let engine = Engine::new(&config).expect("invalid configuration");
//! let result = engine
//!     .calculate(&repo, &CalculateOptions::default())
//!     .expect("no branch configuration");
//!
//! println!("{}", result.variables.full_sem_ver);
//! ```
#![deny(unsafe_code)]

pub mod branch_config;

pub mod cache;

pub mod calculator;

pub mod config;

pub mod context;

pub mod deployment;

pub mod engine;

pub mod error;

pub mod git;

pub mod increment;

pub mod merge_message;

pub mod repository;

pub mod retry;

pub mod strategies;

pub mod variables;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use deployment::DeploymentMode;

pub use engine::{CalculateOptions, Calculation, Engine};

pub use error::{ConfigError, ConfigResult};

pub use variables::GitVersionVariables;

pub use version::{SemanticVersion, VersionError};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
