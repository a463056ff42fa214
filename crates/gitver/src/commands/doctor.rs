//! Doctor command — check that gitver can run here.

use clap::Args;
use gitver_core::{Engine, config, git};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::Session;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    /// Every required check passed
    healthy: bool,
    git: GitCheck,
    config: ConfigCheck,
    directories: Directories,
    environment: Vec<EnvVar>,
}

#[derive(Serialize)]
struct GitCheck {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    inside_repo: bool,
}

#[derive(Serialize)]
struct ConfigCheck {
    sources: Vec<String>,
    /// Every configured pattern compiles
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct Directories {
    config: Option<String>,
    cache: Option<String>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

const ENV_VARS: &[(&str, &str)] = &[
    ("XDG_CONFIG_HOME", "Override config directory"),
    ("XDG_CACHE_HOME", "Override cache directory"),
    ("RUST_LOG", "Log filter directive"),
    ("GITVER_LOG_PATH", "JSON-lines log file"),
    ("GITVER_LOG_DIR", "JSON-lines log directory"),
    ("GITVER_TAG_PREFIX", "Tag prefix regex"),
    ("GITVER_NEXT_VERSION", "Minimum next version"),
    ("GITVER_MODE", "Default deployment mode"),
];

impl DoctorReport {
    fn gather(session: &Session) -> Self {
        let git_path = which::which("git").ok();
        let inside_repo = git_path.is_some() && git::is_inside_repo(&session.cwd).unwrap_or(false);
        let engine = Engine::new(&session.config);

        let git = GitCheck {
            available: git_path.is_some(),
            path: git_path.map(|p| p.display().to_string()),
            inside_repo,
        };
        let config = ConfigCheck {
            sources: session.config_sources.iter().map(ToString::to_string).collect(),
            valid: engine.is_ok(),
            error: engine.err().map(|e| e.to_string()),
        };

        Self {
            healthy: git.available && git.inside_repo && config.valid,
            git,
            config,
            directories: Directories {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
            },
            environment: ENV_VARS
                .iter()
                .map(|&(name, description)| EnvVar {
                    name,
                    value: std::env::var(name).ok(),
                    description,
                })
                .collect(),
        }
    }
}

/// Check git, the repository, configuration and directories.
#[instrument(name = "cmd_doctor", skip_all)]
pub fn cmd_doctor(_args: DoctorArgs, session: &Session) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Checking git and configuration...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    let report = DoctorReport::gather(session);
    spinner.finish_and_clear();
    debug!(healthy = report.healthy, "doctor finished");

    if session.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report, &session.cwd));
    }
    Ok(())
}

fn pass(ok: bool) -> String {
    if ok {
        "✓".if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    } else {
        "✗".if_supports_color(Stream::Stdout, |s| s.red()).to_string()
    }
}

fn render_text(report: &DoctorReport, cwd: &camino::Utf8Path) -> String {
    let mut out = String::new();

    out.push_str("Git\n");
    match report.git.path {
        Some(ref path) => out.push_str(&format!("  {} git: {path}\n", pass(true))),
        None => out.push_str(&format!("  {} git not found on PATH\n", pass(false))),
    }
    if report.git.inside_repo {
        out.push_str(&format!("  {} {cwd} is inside a repository\n", pass(true)));
    } else {
        out.push_str(&format!("  {} {cwd} is not inside a repository\n", pass(false)));
    }

    out.push_str("\nConfiguration\n");
    if report.config.sources.is_empty() {
        out.push_str("  built-in defaults only\n");
    }
    for source in &report.config.sources {
        out.push_str(&format!("  {source}\n"));
    }
    match report.config.error {
        Some(ref err) => out.push_str(&format!("  {} {err}\n", pass(false))),
        None => out.push_str(&format!("  {} all patterns compile\n", pass(true))),
    }

    out.push_str("\nDirectories\n");
    for (label, dir) in [
        ("Config", &report.directories.config),
        ("Cache", &report.directories.cache),
    ] {
        out.push_str(&format!("  {label}: {}\n", dir.as_deref().unwrap_or("(unavailable)")));
    }

    let set: Vec<_> = report.environment.iter().filter(|v| v.value.is_some()).collect();
    if !set.is_empty() {
        out.push_str("\nEnvironment\n");
        for var in set {
            out.push_str(&format!("  {}={}\n", var.name, var.value.as_deref().unwrap_or("")));
        }
    }
    out
}
