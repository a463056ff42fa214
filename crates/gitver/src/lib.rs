//! Command-line front end for `gitver-core`.
//!
//! [`Cli`] parses arguments, [`Session`] carries the working directory and
//! merged configuration every command runs against, and [`Commands::run`]
//! dispatches. [`command()`] feeds man page and completion generation in
//! `xtask`.

pub mod commands;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{CommandFactory, Parser, Subcommand};
use gitver_core::config::{Config, ConfigLoader};

/// When to colorize output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorChoice {
    /// Color when the stream is a terminal.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

impl ColorChoice {
    /// Force stdout coloring on or off. `Auto` keeps per-stream detection.
    pub fn apply(self) {
        match self {
            Self::Auto => {}
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }

    /// Whether log lines written to stderr should carry ANSI styling.
    pub fn stderr_ansi(self) -> bool {
        match self {
            Self::Auto => std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG              Log filter (e.g., debug, gitver_core=trace)
    GITVER_LOG_PATH       Write JSON-lines logs to this file
    GITVER_LOG_DIR        Write daily JSON-lines logs into this directory
    GITVER_TAG_PREFIX     Tag prefix regex
    GITVER_NEXT_VERSION   Minimum next version
    GITVER_MODE           Default deployment mode
    GITVER_INCREMENT      Default increment
    GITVER_LABEL          Default pre-release label
";

/// Command-line interface definition for gitver.
#[derive(Parser, Debug)]
#[command(name = "gitver")]
#[command(about = "Semantic versions calculated from git history", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Merge FILE over discovered configuration
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Version the repository containing DIR
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log decisions (-v) or everything (-vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calculate the version of the current commit
    Calculate(commands::calculate::CalculateArgs),

    /// Show the effective configuration
    Config(commands::config::ConfigArgs),

    /// Diagnose git, configuration and directories
    Doctor(commands::doctor::DoctorArgs),

    /// Show what gitver sees in this repository
    Info(commands::info::InfoArgs),
}

impl Commands {
    /// Subcommand name, recorded on the root log span.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Calculate(_) => "calculate",
            Self::Config(_) => "config",
            Self::Doctor(_) => "doctor",
            Self::Info(_) => "info",
        }
    }

    /// Execute the subcommand.
    pub fn run(self, session: &Session) -> anyhow::Result<()> {
        match self {
            Self::Calculate(args) => commands::calculate::cmd_calculate(args, session),
            Self::Config(args) => commands::config::cmd_config(args, session),
            Self::Doctor(args) => commands::doctor::cmd_doctor(args, session),
            Self::Info(args) => commands::info::cmd_info(args, session),
        }
    }
}

/// Working directory and configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Session {
    /// Directory the repository is discovered from.
    pub cwd: Utf8PathBuf,
    /// Merged configuration.
    pub config: Config,
    /// Files merged into `config`, lowest precedence first.
    pub config_sources: Vec<Utf8PathBuf>,
    /// Global `--json` flag.
    pub json: bool,
}

impl Session {
    /// A session over `cwd` with no configuration files.
    pub fn new(cwd: impl Into<Utf8PathBuf>, config: Config) -> Self {
        Self {
            cwd: cwd.into(),
            config,
            config_sources: Vec::new(),
            json: false,
        }
    }

    /// Apply `--chdir`, then discover and load configuration.
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        if let Some(ref dir) = cli.chdir {
            std::env::set_current_dir(dir)
                .with_context(|| format!("failed to change directory to {}", dir.display()))?;
        }
        let cwd = std::env::current_dir().context("failed to determine current directory")?;
        let cwd = utf8(cwd, "current directory")?;

        let mut loader = ConfigLoader::new().with_project_search(&cwd);
        if let Some(ref path) = cli.config {
            loader = loader.with_file(utf8(path.clone(), "config path")?);
        }
        let config_sources = loader.sources();
        let config = loader.load().context("failed to load configuration")?;

        Ok(Self {
            cwd,
            config,
            config_sources,
            json: cli.json,
        })
    }
}

fn utf8(path: PathBuf, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| anyhow::anyhow!("{what} is not valid UTF-8: {}", p.display()))
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
