//! Info command — what gitver sees from the working directory.

use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tracing::{debug, instrument};

use gitver_core::branch_config::BranchConfigurationResolver;
use gitver_core::cache::FileVersionCache;
use gitver_core::repository::RepositorySnapshot;
use gitver_core::{Config, git};

use crate::Session;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct InfoReport {
    name: &'static str,
    version: &'static str,
    config: ConfigSummary,
    repository: RepositorySummary,
    cache: CacheSummary,
}

#[derive(Serialize)]
struct ConfigSummary {
    /// Files merged over the defaults, lowest precedence first
    sources: Vec<String>,
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_version: Option<String>,
    strategies: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum RepositorySummary {
    Detected {
        branch: String,
        head: String,
        commits: usize,
        tags: usize,
        uncommitted_changes: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        branch_config: Option<BranchSummary>,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Serialize)]
struct BranchSummary {
    fragments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    increment: String,
    mode: String,
}

#[derive(Serialize)]
struct CacheSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    dir: Option<String>,
    entries: usize,
}

impl ConfigSummary {
    fn new(config: &Config, sources: &[camino::Utf8PathBuf]) -> Self {
        Self {
            sources: sources.iter().map(ToString::to_string).collect(),
            mode: config.mode.to_string(),
            tag_prefix: config.tag_prefix.clone(),
            next_version: config.next_version.clone(),
            strategies: config
                .version_strategies
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RepositorySummary {
    fn detect(session: &Session) -> Self {
        let repo = match git::load_snapshot(&session.cwd) {
            Ok(repo) => repo,
            Err(err) => {
                debug!(error = %err, "no repository");
                return Self::Unavailable {
                    reason: err.to_string(),
                };
            }
        };

        let branch = repo.current_branch();
        let branch_config = BranchConfigurationResolver::new(&session.config)
            .and_then(|resolver| resolver.resolve(&branch))
            .inspect_err(|err| debug!(error = %err, "branch configuration unavailable"))
            .ok()
            .map(|effective| BranchSummary {
                fragments: effective.fragments,
                label: effective.label,
                increment: effective.increment.to_string(),
                mode: effective.mode.to_string(),
            });

        Self::Detected {
            branch: branch.friendly_name().to_string(),
            head: repo.current_commit().short_sha().to_string(),
            commits: repo.len(),
            tags: repo.tags().len(),
            uncommitted_changes: repo.uncommitted_change_count(),
            branch_config,
        }
    }
}

impl InfoReport {
    fn gather(session: &Session) -> Self {
        let cache = FileVersionCache::in_user_cache();
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            config: ConfigSummary::new(&session.config, &session.config_sources),
            repository: RepositorySummary::detect(session),
            cache: CacheSummary {
                dir: cache.as_ref().map(|c| c.dir().to_string()),
                entries: cache.as_ref().map_or(0, FileVersionCache::entry_count),
            },
        }
    }
}

/// Report configuration sources, the detected repository and the cache.
#[instrument(name = "cmd_info", skip_all)]
pub fn cmd_info(_args: InfoArgs, session: &Session) -> anyhow::Result<()> {
    let report = InfoReport::gather(session);

    if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn dim(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.dimmed()).to_string()
}

fn heading(text: &str) -> String {
    text.if_supports_color(Stream::Stdout, |t| t.bold()).to_string()
}

fn render_text(report: &InfoReport) -> String {
    let mut out = format!("{} {}\n\n", report.name, report.version);

    let config = &report.config;
    out.push_str(&format!("{}\n", heading("Configuration")));
    if config.sources.is_empty() {
        out.push_str(&format!("  {}: built-in defaults\n", dim("Sources")));
    } else {
        out.push_str(&format!("  {}: {}\n", dim("Sources"), config.sources.join(", ")));
    }
    out.push_str(&format!("  {}: {}\n", dim("Mode"), config.mode));
    if let Some(ref prefix) = config.tag_prefix {
        out.push_str(&format!("  {}: {prefix}\n", dim("Tag prefix")));
    }
    if let Some(ref next) = config.next_version {
        out.push_str(&format!("  {}: {next}\n", dim("Next version")));
    }
    out.push_str(&format!("  {}: {}\n\n", dim("Strategies"), config.strategies.join(", ")));

    out.push_str(&format!("{}\n", heading("Repository")));
    match report.repository {
        RepositorySummary::Detected {
            ref branch,
            ref head,
            commits,
            tags,
            uncommitted_changes,
            ref branch_config,
        } => {
            out.push_str(&format!("  {}: {branch} ({head})\n", dim("Branch")));
            out.push_str(&format!(
                "  {}: {commits} commits, {tags} tags, {uncommitted_changes} uncommitted changes\n",
                dim("History")
            ));
            match branch_config {
                Some(bc) => out.push_str(&format!(
                    "  {}: {} (label {}, increment {}, mode {})\n",
                    dim("Branch config"),
                    bc.fragments.join(" + "),
                    bc.label.as_deref().unwrap_or("none"),
                    bc.increment,
                    bc.mode
                )),
                None => out.push_str(&format!("  {}: no match\n", dim("Branch config"))),
            }
        }
        RepositorySummary::Unavailable { ref reason } => {
            out.push_str(&format!("  {}: {reason}\n", dim("Not available")));
        }
    }
    out.push('\n');

    out.push_str(&format!("{}\n", heading("Cache")));
    match report.cache.dir {
        Some(ref dir) => out.push_str(&format!(
            "  {}: {dir} ({} entries)\n",
            dim("Directory"),
            report.cache.entries
        )),
        None => out.push_str(&format!("  {}: unavailable\n", dim("Directory"))),
    }
    out
}
