//! Calculate command — print the version variables for the current commit.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use tracing::{debug, instrument};

use gitver_core::cache::FileVersionCache;
use gitver_core::retry::RetryPolicy;
use gitver_core::{CalculateOptions, DeploymentMode, Engine, GitVersionVariables, git};

use crate::Session;

/// Arguments for the `calculate` subcommand.
#[derive(Args, Debug, Default)]
pub struct CalculateArgs {
    /// Calculate as if BRANCH were checked out
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Override the deployment mode
    #[arg(long, value_enum)]
    pub mode: Option<DeploymentMode>,

    /// Print only the value of one variable (e.g. SemVer)
    #[arg(long, value_name = "NAME")]
    pub show_variable: Option<String>,

    /// Also write the variables as JSON to PATH
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<Utf8PathBuf>,

    /// Skip the version cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Calculate and print the version for the repository at `session.cwd`.
#[instrument(name = "cmd_calculate", skip_all, fields(branch = args.branch.as_deref()))]
pub fn cmd_calculate(args: CalculateArgs, session: &Session) -> anyhow::Result<()> {
    let repo = git::load_snapshot(&session.cwd).context("failed to read git repository")?;
    let engine = Engine::new(&session.config).context("invalid configuration")?;
    let options = CalculateOptions {
        target_branch: args.branch,
        mode: args.mode,
    };

    let cache = FileVersionCache::in_user_cache().filter(|_| !args.no_cache);
    let variables = match cache {
        Some(mut cache) => engine.calculate_cached(&repo, &options, &mut cache),
        None => engine.calculate(&repo, &options).map(|c| c.variables),
    }
    .context("failed to calculate version")?;
    debug!(
        full_sem_ver = %variables.full_sem_ver,
        source = variables.version_source_sha.as_deref().unwrap_or("none"),
        use_cache = !args.no_cache,
        "calculated"
    );

    if let Some(ref path) = args.output_file {
        variables
            .to_file(path, RetryPolicy::default())
            .with_context(|| format!("failed to write {path}"))?;
    }

    if let Some(ref name) = args.show_variable {
        let value = variables
            .get(name)
            .with_context(|| format!("unknown variable: {name}"))?;
        println!("{value}");
    } else if session.json {
        println!("{}", variables.to_json()?);
    } else {
        print!("{}", render_text(&variables));
    }

    Ok(())
}

fn render_text(variables: &GitVersionVariables) -> String {
    variables
        .pairs()
        .into_iter()
        .map(|(name, value)| {
            format!(
                "{}: {}\n",
                name.if_supports_color(Stream::Stdout, |n| n.dimmed()),
                value
            )
        })
        .collect()
}
